use std::{fmt, str::FromStr};

use bincode::{Decode, Encode};
use uuid::Uuid;

use super::ValueError;
use crate::codec::{Buffer, Pop, Push, SerializationError};

/// A 128-bit namespace identifier with the classic field layout.
///
/// On the wire the integer fields are little-endian, clock sequence and node are raw bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Encode, Decode)]
pub struct Guid {
    pub time_low: u32,
    pub time_mid: u16,
    pub time_hi_version: u16,
    pub clock_seq: [u8; 2],
    pub node: [u8; 6],
}

impl Guid {
    /// Property set used by gromox-specific named properties.
    pub const PSETID_GROMOX: Guid = Guid::new(
        0x1DE937E2,
        0x85C6,
        0x40A1,
        [0xBD, 0x9D],
        [0xA6, 0xE2, 0xB7, 0xB7, 0x87, 0xB1],
    );

    pub const fn new(
        time_low: u32,
        time_mid: u16,
        time_hi_version: u16,
        clock_seq: [u8; 2],
        node: [u8; 6],
    ) -> Self {
        Self {
            time_low,
            time_mid,
            time_hi_version,
            clock_seq,
            node,
        }
    }

    /// Deterministic store GUID of a domain.
    pub const fn from_domain_id(domain_id: u32) -> Self {
        Self::new(
            domain_id,
            0x0afb,
            0x7df6,
            [0x91, 0x92],
            [0x49, 0x88, 0x6a, 0xa7, 0x38, 0xce],
        )
    }

    fn as_uuid(&self) -> Uuid {
        let mut tail = [0; 8];
        tail[..2].copy_from_slice(&self.clock_seq);
        tail[2..].copy_from_slice(&self.node);
        Uuid::from_fields(self.time_low, self.time_mid, self.time_hi_version, &tail)
    }
}

impl FromStr for Guid {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s).map_err(|source| ValueError::Guid {
            input: s.to_string(),
            source,
        })?;
        let (time_low, time_mid, time_hi_version, tail) = uuid.as_fields();
        let mut clock_seq = [0; 2];
        let mut node = [0; 6];
        clock_seq.copy_from_slice(&tail[..2]);
        node.copy_from_slice(&tail[2..]);
        Ok(Self::new(time_low, time_mid, time_hi_version, clock_seq, node))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_uuid().hyphenated())
    }
}

impl Push for Guid {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.encode(*self)
    }
}

impl Pop for Guid {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        buf.decode()
    }
}

/// A GUID-qualified change identifier truncated to `size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedXid {
    pub size: u8,
    pub guid: Guid,
    /// GC value, see [`crate::util::value_to_gc`].
    pub local_id: u64,
}

impl SizedXid {
    pub const MIN_SIZE: u8 = 17;
    pub const MAX_SIZE: u8 = 24;

    pub fn new(size: u8, guid: Guid, local_id: u64) -> Self {
        Self {
            size,
            guid,
            local_id,
        }
    }

    /// Write the XID without its size prefix.
    pub fn write_xid(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&self.size) {
            return Err(SerializationError::Invalid {
                what: "XID size",
                reason: self.size.to_string(),
            });
        }
        buf.push(&self.guid)?;
        buf.push_raw(&self.local_id.to_ne_bytes()[..usize::from(self.size) - 16]);
        Ok(())
    }
}

impl Push for SizedXid {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&self.size)?;
        self.write_xid(buf)
    }
}
