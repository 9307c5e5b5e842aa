//! Binary buffer codec.
//!
//! Every exmdb message is built in, and every response parsed from, a [`Buffer`]: a
//! growable byte vector with a read cursor. Values are written with [`Buffer::push`] and
//! read back with [`Buffer::pop`], dispatching on the [`Push`] and [`Pop`] traits so that
//! structured types can plug in their own wire format without touching the buffer itself.
//!
//! # Wire Format
//!
//! - Integers and floats are little-endian and fixed width. They are encoded through
//!   `bincode` configured with [`LittleEndian`] byte order and [`Fixint`] integer encoding.
//! - Strings are raw bytes followed by a single NUL terminator, with no length prefix.
//! - Booleans travel as a single byte; any non-zero value reads back as `true`.
//! - Counted collections carry either a 2-byte or a 4-byte count prefix, chosen by the
//!   caller through [`Buffer::push_list16`] / [`Buffer::push_list32`].
//!
//! Outgoing messages are bracketed by [`Buffer::start`] and [`Buffer::finalize`], which
//! reserve and then patch a 4-byte length header covering everything after it.
//!
//! # Example
//! ```rust
//! use exmdb::codec::Buffer;
//!
//! let mut buf = Buffer::new();
//! buf.start();
//! buf.push(&(0x2du8, "/var/lib/store", 7u32)).unwrap();
//! buf.finalize().unwrap();
//!
//! assert_eq!(&buf.as_bytes()[..4], &20u32.to_le_bytes());
//! ```
use std::{
    fmt,
    io::{self, Read},
};

use bincode::{
    Decode, Encode,
    config::{Configuration, Fixint, LittleEndian},
    decode_from_slice, encode_into_slice, encode_into_std_write,
    error::DecodeError,
};

pub use error::SerializationError;

const LENGTH_PREFIX: usize = size_of::<u32>();

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum SerializationError {
        #[error("failed to encode value: {0}")]
        Encode(#[from] bincode::error::EncodeError),

        #[error("failed to decode value: {0}")]
        Decode(#[from] bincode::error::DecodeError),

        #[error("buffer underflow: {needed} bytes requested, {available} available")]
        Underflow { needed: usize, available: usize },

        #[error("string is missing its NUL terminator")]
        Unterminated,

        #[error("string contains an interior NUL byte")]
        InteriorNul,

        #[error("string is not valid utf-8: {0}")]
        Utf8(#[from] std::str::Utf8Error),

        #[error("{what} count {count} exceeds the maximum of {max}")]
        TooMany {
            what: &'static str,
            count: usize,
            max: usize,
        },

        #[error("deserialization of property type {0:#06x} is not supported")]
        UnknownType(u16),

        #[error("invalid {what}: {reason}")]
        Invalid { what: &'static str, reason: String },

        #[error("message was finalized without being started")]
        Unframed,
    }
}

/// A value with a wire representation.
pub trait Push {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError>;
}

/// A value that can be read back from the wire.
///
/// Decoded values always own their data.
pub trait Pop: Sized {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError>;
}

pub struct Buffer {
    data: Vec<u8>,
    pos: usize,
    config: Configuration<LittleEndian, Fixint>,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        let mut buf = Self::new();
        buf.data = data;
        buf
    }
}

impl Buffer {
    pub fn new() -> Self {
        let config = bincode::config::standard()
            .with_little_endian()
            .with_fixed_int_encoding();
        Self {
            data: Vec::new(),
            pos: 0,
            config,
        }
    }

    /// Begin a new outgoing message, discarding previous contents.
    pub fn start(&mut self) {
        self.clear();
        self.data.extend_from_slice(&[0; LENGTH_PREFIX]);
    }

    /// Patch the length header reserved by [`Buffer::start`].
    pub fn finalize(&mut self) -> Result<(), SerializationError> {
        let len = self
            .data
            .len()
            .checked_sub(LENGTH_PREFIX)
            .ok_or(SerializationError::Unframed)?;
        let len = u32::try_from(len).map_err(|_| SerializationError::TooMany {
            what: "message byte",
            count: len,
            max: u32::MAX as usize,
        })?;
        encode_into_slice(len, &mut self.data[..LENGTH_PREFIX], self.config)?;
        Ok(())
    }

    pub fn push<T: Push + ?Sized>(&mut self, value: &T) -> Result<(), SerializationError> {
        value.push_into(self)
    }

    pub fn push_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Push a slice prefixed by a 2-byte element count.
    pub fn push_list16<T: Push>(&mut self, items: &[T]) -> Result<(), SerializationError> {
        let count = u16::try_from(items.len()).map_err(|_| SerializationError::TooMany {
            what: "list element",
            count: items.len(),
            max: u16::MAX as usize,
        })?;
        self.push(&count)?;
        items.iter().try_for_each(|item| item.push_into(self))
    }

    /// Push a slice prefixed by a 4-byte element count.
    pub fn push_list32<T: Push>(&mut self, items: &[T]) -> Result<(), SerializationError> {
        let count = u32::try_from(items.len()).map_err(|_| SerializationError::TooMany {
            what: "list element",
            count: items.len(),
            max: u32::MAX as usize,
        })?;
        self.push(&count)?;
        items.iter().try_for_each(|item| item.push_into(self))
    }

    /// Encode a fixed-layout value with the buffer's bincode configuration.
    pub fn encode<E: Encode>(&mut self, value: E) -> Result<(), SerializationError> {
        encode_into_std_write(value, &mut self.data, self.config)?;
        Ok(())
    }

    pub fn pop<T: Pop>(&mut self) -> Result<T, SerializationError> {
        T::pop_from(self)
    }

    pub fn pop_raw(&mut self, len: usize) -> Result<&[u8], SerializationError> {
        if len > self.remaining() {
            return Err(SerializationError::Underflow {
                needed: len,
                available: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    /// Pop a NUL-terminated string, borrowing it from the buffer.
    pub fn pop_str(&mut self) -> Result<&str, SerializationError> {
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(SerializationError::Unterminated)?;
        let start = self.pos;
        self.pos += end + 1;
        Ok(std::str::from_utf8(&self.data[start..start + end])?)
    }

    pub fn pop_list16<T: Pop>(&mut self) -> Result<Vec<T>, SerializationError> {
        let count: u16 = self.pop()?;
        self.pop_items(count as usize)
    }

    pub fn pop_list32<T: Pop>(&mut self) -> Result<Vec<T>, SerializationError> {
        let count: u32 = self.pop()?;
        self.pop_items(count as usize)
    }

    fn pop_items<T: Pop>(&mut self, count: usize) -> Result<Vec<T>, SerializationError> {
        // every element occupies at least one byte
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(self.pop()?);
        }
        Ok(items)
    }

    /// Decode a fixed-layout value with the buffer's bincode configuration.
    pub fn decode<D: Decode<()>>(&mut self) -> Result<D, SerializationError> {
        let available = self.remaining();
        match decode_from_slice(&self.data[self.pos..], self.config) {
            Ok((value, read)) => {
                self.pos += read;
                Ok(value)
            }
            Err(DecodeError::UnexpectedEnd { additional }) => Err(SerializationError::Underflow {
                needed: available + additional,
                available,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop all contents and rewind the cursor.
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    /// Rewind the read cursor, keeping the contents.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Resize the contents to exactly `len` bytes, zero-filling any growth.
    pub fn resize(&mut self, len: usize) {
        self.data.resize(len, 0);
        self.pos = self.pos.min(len);
    }

    /// Current read cursor position.
    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Replace the contents with exactly `len` bytes from `reader`.
    ///
    /// Storage grows with the bytes actually received, not with `len`.
    pub fn read_from<R: Read>(&mut self, reader: &mut R, len: usize) -> io::Result<()> {
        self.clear();
        let read = reader.take(len as u64).read_to_end(&mut self.data)?;
        if read < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, got {read}"),
            ));
        }
        Ok(())
    }
}

macro_rules! fixed_width {
    ($($t:ty),*) => {$(
        impl Push for $t {
            fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
                buf.encode(*self)
            }
        }

        impl Pop for $t {
            fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
                buf.decode()
            }
        }
    )*};
}

fixed_width!(u8, u16, u32, u64, i16, i32, i64, f32, f64);

impl Push for bool {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&u8::from(*self))
    }
}

impl Pop for bool {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(buf.pop::<u8>()? != 0)
    }
}

impl Push for str {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        if self.as_bytes().contains(&0) {
            return Err(SerializationError::InteriorNul);
        }
        buf.push_raw(self.as_bytes());
        buf.push_raw(&[0]);
        Ok(())
    }
}

impl Push for String {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        self.as_str().push_into(buf)
    }
}

impl Pop for String {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        buf.pop_str().map(str::to_owned)
    }
}

impl<T: Push + ?Sized> Push for &T {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        (**self).push_into(buf)
    }
}

macro_rules! push_tuple {
    ($($name:ident),+) => {
        impl<$($name: Push),+> Push for ($($name,)+) {
            #[allow(non_snake_case)]
            fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
                let ($($name,)+) = self;
                $($name.push_into(buf)?;)+
                Ok(())
            }
        }
    };
}

push_tuple!(A);
push_tuple!(A, B);
push_tuple!(A, B, C);
push_tuple!(A, B, C, D);
push_tuple!(A, B, C, D, E);
push_tuple!(A, B, C, D, E, F);
push_tuple!(A, B, C, D, E, F, G);
push_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_patches_length_header() {
        let mut buf = Buffer::new();
        buf.start();
        buf.push(&(0x5eu8, "home")).unwrap();
        buf.finalize().unwrap();

        assert_eq!(buf.as_bytes(), &[6, 0, 0, 0, 0x5e, b'h', b'o', b'm', b'e', 0]);
    }

    #[test]
    fn finalize_without_start() {
        let mut buf = Buffer::new();
        assert!(matches!(buf.finalize(), Err(SerializationError::Unframed)));
    }

    #[test]
    fn integers_are_little_endian() {
        let mut buf = Buffer::new();
        buf.push(&(0x0102u16, 0x03040506u32, true)).unwrap();

        assert_eq!(buf.as_bytes(), &[0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x01]);
        assert_eq!(buf.pop::<u16>().unwrap(), 0x0102);
        assert_eq!(buf.pop::<u32>().unwrap(), 0x03040506);
        assert!(buf.pop::<bool>().unwrap());
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn string_interior_nul() {
        let mut buf = Buffer::new();
        assert!(matches!(
            buf.push("a\0b"),
            Err(SerializationError::InteriorNul)
        ));
    }

    #[test]
    fn string_unterminated() {
        let mut buf = Buffer::from(b"abc".to_vec());
        assert!(matches!(
            buf.pop::<String>(),
            Err(SerializationError::Unterminated)
        ));
    }

    #[test]
    fn empty_string() {
        let mut buf = Buffer::new();
        buf.push("").unwrap();
        assert_eq!(buf.as_bytes(), &[0]);
        assert_eq!(buf.pop::<String>().unwrap(), "");
    }

    #[test]
    fn pop_underflow() {
        let mut buf = Buffer::from(vec![1, 2, 3]);
        assert!(buf.pop::<u32>().is_err());
        assert!(matches!(
            buf.pop_raw(4),
            Err(SerializationError::Underflow {
                needed: 4,
                available: 3
            })
        ));
        assert_eq!(buf.pop_raw(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn read_from_short_source() {
        let mut buf = Buffer::from(vec![9; 16]);
        let err = buf
            .read_from(&mut io::Cursor::new([1u8, 2, 3]), u32::MAX as usize)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(buf.as_bytes(), &[1, 2, 3]);

        buf.read_from(&mut io::Cursor::new([4u8, 5, 6]), 2).unwrap();
        assert_eq!(buf.as_bytes(), &[4, 5]);
        assert_eq!(buf.pop::<u16>().unwrap(), 0x0504);
    }

    #[test]
    fn short_fixed_width_read() {
        let mut buf = Buffer::from(vec![1, 2]);
        assert!(matches!(
            buf.pop::<u32>(),
            Err(SerializationError::Underflow {
                needed: 4,
                available: 2
            })
        ));
        // the cursor does not move on failure
        assert_eq!(buf.pop::<u16>().unwrap(), 0x0201);
        assert!(matches!(
            buf.pop::<u8>(),
            Err(SerializationError::Underflow {
                needed: 1,
                available: 0
            })
        ));
    }

    #[test]
    fn list16_overflow() {
        let mut buf = Buffer::new();
        let items = vec![0u8; u16::MAX as usize + 1];
        assert!(matches!(
            buf.push_list16(&items),
            Err(SerializationError::TooMany { count: 65536, .. })
        ));
    }

    #[test]
    fn lists_carry_count_prefix() {
        let mut buf = Buffer::new();
        buf.push_list16(&[7u32, 9]).unwrap();
        buf.push_list32(&["x"]).unwrap();

        assert_eq!(buf.pop_list16::<u32>().unwrap(), vec![7, 9]);
        assert_eq!(buf.pop_list32::<String>().unwrap(), vec!["x".to_string()]);
    }

    #[test]
    fn reuse_between_messages() {
        let mut buf = Buffer::new();
        buf.start();
        buf.push(&1u64).unwrap();
        buf.finalize().unwrap();
        buf.start();
        buf.push(&1u8).unwrap();
        buf.finalize().unwrap();

        assert_eq!(buf.len(), 5);
        buf.resize(2);
        assert_eq!(buf.as_bytes(), &[1, 0]);
        buf.reset();
        assert_eq!(buf.tell(), 0);
    }
}
