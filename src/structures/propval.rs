use std::{borrow::Cow, fmt};

use chrono::{Local, TimeZone};

use super::ValueError;
use crate::{
    codec::{Buffer, Pop, Push, SerializationError},
    util,
};

const MV_FLAG: u16 = 0x1000;

/// Wire type of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PropType {
    Unspecified = 0x0000,
    Short = 0x0002,
    Long = 0x0003,
    Float = 0x0004,
    Double = 0x0005,
    Currency = 0x0006,
    FloatingTime = 0x0007,
    Error = 0x000A,
    Byte = 0x000B,
    LongLong = 0x0014,
    String = 0x001E,
    WString = 0x001F,
    FileTime = 0x0040,
    Binary = 0x0102,
    ShortArray = 0x1002,
    LongArray = 0x1003,
    FloatArray = 0x1004,
    DoubleArray = 0x1005,
    CurrencyArray = 0x1006,
    FloatingTimeArray = 0x1007,
    LongLongArray = 0x1014,
    StringArray = 0x101E,
    WStringArray = 0x101F,
    BinaryArray = 0x1102,
}

impl TryFrom<u16> for PropType {
    type Error = ValueError;

    fn try_from(code: u16) -> Result<Self, ValueError> {
        let t = match code {
            0x0000 => PropType::Unspecified,
            0x0002 => PropType::Short,
            0x0003 => PropType::Long,
            0x0004 => PropType::Float,
            0x0005 => PropType::Double,
            0x0006 => PropType::Currency,
            0x0007 => PropType::FloatingTime,
            0x000A => PropType::Error,
            0x000B => PropType::Byte,
            0x0014 => PropType::LongLong,
            0x001E => PropType::String,
            0x001F => PropType::WString,
            0x0040 => PropType::FileTime,
            0x0102 => PropType::Binary,
            0x1002 => PropType::ShortArray,
            0x1003 => PropType::LongArray,
            0x1004 => PropType::FloatArray,
            0x1005 => PropType::DoubleArray,
            0x1006 => PropType::CurrencyArray,
            0x1007 => PropType::FloatingTimeArray,
            0x1014 => PropType::LongLongArray,
            0x101E => PropType::StringArray,
            0x101F => PropType::WStringArray,
            0x1102 => PropType::BinaryArray,
            _ => return Err(ValueError::UnknownType(code)),
        };
        Ok(t)
    }
}

impl PropType {
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Type code carried in the low 16 bits of a proptag.
    pub fn tag_code(tag: u32) -> u16 {
        (tag & 0xFFFF) as u16
    }

    /// Whether values of this type are serialized with an element count.
    pub fn is_array(self) -> bool {
        self == PropType::Binary || self.code() & MV_FLAG != 0
    }

    pub fn name(self) -> &'static str {
        match self {
            PropType::Byte => "BYTE",
            PropType::Short => "SHORT",
            PropType::Long => "LONG",
            PropType::Error => "ERROR",
            PropType::LongLong => "LONGLONG",
            PropType::Currency => "CURRENCY",
            PropType::FileTime => "FILETIME",
            PropType::Float => "FLOAT",
            PropType::Double => "DOUBLE",
            PropType::FloatingTime => "FLOATINGTIME",
            PropType::String => "STRING",
            PropType::WString => "WSTRING",
            PropType::Binary => "BINARY",
            PropType::ShortArray => "SHORT ARRAY",
            PropType::LongArray => "LONG ARRAY",
            PropType::LongLongArray => "LONGLONG ARRAY",
            PropType::CurrencyArray => "CURRENCY ARRAY",
            PropType::FloatArray => "FLOAT ARRAY",
            PropType::DoubleArray => "DOUBLE ARRAY",
            PropType::FloatingTimeArray => "FLOATINGTIME ARRAY",
            PropType::StringArray => "STRING ARRAY",
            PropType::WStringArray => "WSTRING ARRAY",
            PropType::BinaryArray => "BINARY ARRAY",
            PropType::Unspecified => "UNKNOWN",
        }
    }
}

/// Display name of a raw type code, `"UNKNOWN"` for unrecognized codes.
pub fn type_name(code: u16) -> &'static str {
    PropType::try_from(code).map_or("UNKNOWN", PropType::name)
}

/// Payload of a [`TaggedPropval`].
///
/// Pointer-backed payloads are either owned or borrowed from caller memory, which the
/// lifetime ties to the source data.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue<'a> {
    Byte(u8),
    Short(u16),
    Long(u32),
    LongLong(u64),
    Float(f32),
    Double(f64),
    String(Cow<'a, str>),
    Binary(Cow<'a, [u8]>),
    ShortArray(Cow<'a, [u16]>),
    LongArray(Cow<'a, [u32]>),
    LongLongArray(Cow<'a, [u64]>),
    FloatArray(Cow<'a, [f32]>),
    DoubleArray(Cow<'a, [f64]>),
    StringArray(Vec<Cow<'a, str>>),
    BinaryArray(Vec<Cow<'a, [u8]>>),
}

impl PropValue<'_> {
    fn accepts(&self, t: PropType) -> bool {
        use PropType as T;
        matches!(
            (self, t),
            (Self::Byte(_), T::Byte)
                | (Self::Short(_), T::Short)
                | (Self::Long(_), T::Long | T::Error)
                | (Self::LongLong(_), T::LongLong | T::Currency | T::FileTime)
                | (Self::Float(_), T::Float)
                | (Self::Double(_), T::Double | T::FloatingTime)
                | (Self::String(_), T::String | T::WString)
                | (Self::Binary(_), T::Binary)
                | (Self::ShortArray(_), T::ShortArray)
                | (Self::LongArray(_), T::LongArray)
                | (Self::LongLongArray(_), T::LongLongArray | T::CurrencyArray)
                | (Self::FloatArray(_), T::FloatArray)
                | (Self::DoubleArray(_), T::DoubleArray | T::FloatingTimeArray)
                | (Self::StringArray(_), T::StringArray | T::WStringArray)
                | (Self::BinaryArray(_), T::BinaryArray)
        )
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Byte(_) => "u8",
            Self::Short(_) => "u16",
            Self::Long(_) => "u32",
            Self::LongLong(_) => "u64",
            Self::Float(_) => "f32",
            Self::Double(_) => "f64",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::ShortArray(_) => "u16 array",
            Self::LongArray(_) => "u32 array",
            Self::LongLongArray(_) => "u64 array",
            Self::FloatArray(_) => "f32 array",
            Self::DoubleArray(_) => "f64 array",
            Self::StringArray(_) => "string array",
            Self::BinaryArray(_) => "binary array",
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),*) => {$(
        impl From<$t> for PropValue<'_> {
            fn from(v: $t) -> Self {
                PropValue::$variant(v)
            }
        }
    )*};
}

value_from!(u8 => Byte, u16 => Short, u32 => Long, u64 => LongLong, f32 => Float, f64 => Double);

macro_rules! slice_from {
    ($($t:ty => $variant:ident),*) => {$(
        impl<'a> From<&'a [$t]> for PropValue<'a> {
            fn from(v: &'a [$t]) -> Self {
                PropValue::$variant(Cow::Borrowed(v))
            }
        }

        impl From<Vec<$t>> for PropValue<'_> {
            fn from(v: Vec<$t>) -> Self {
                PropValue::$variant(Cow::Owned(v))
            }
        }
    )*};
}

slice_from!(
    u8 => Binary,
    u16 => ShortArray,
    u32 => LongArray,
    u64 => LongLongArray,
    f32 => FloatArray,
    f64 => DoubleArray
);

impl<'a> From<&'a str> for PropValue<'a> {
    fn from(v: &'a str) -> Self {
        PropValue::String(Cow::Borrowed(v))
    }
}

impl From<String> for PropValue<'_> {
    fn from(v: String) -> Self {
        PropValue::String(Cow::Owned(v))
    }
}

impl<'a> From<Vec<&'a str>> for PropValue<'a> {
    fn from(v: Vec<&'a str>) -> Self {
        PropValue::StringArray(v.into_iter().map(Cow::Borrowed).collect())
    }
}

impl From<Vec<String>> for PropValue<'_> {
    fn from(v: Vec<String>) -> Self {
        PropValue::StringArray(v.into_iter().map(Cow::Owned).collect())
    }
}

impl<'a> From<Vec<&'a [u8]>> for PropValue<'a> {
    fn from(v: Vec<&'a [u8]>) -> Self {
        PropValue::BinaryArray(v.into_iter().map(Cow::Borrowed).collect())
    }
}

impl From<Vec<Vec<u8>>> for PropValue<'_> {
    fn from(v: Vec<Vec<u8>>) -> Self {
        PropValue::BinaryArray(v.into_iter().map(Cow::Owned).collect())
    }
}

/// A property tag together with its typed value.
///
/// The type is normally encoded in the low 16 bits of the tag. Tags whose type bits are
/// [`PropType::Unspecified`] carry the type separately, both here and on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedPropval<'a> {
    tag: u32,
    prop_type: PropType,
    value: PropValue<'a>,
}

impl<'a> TaggedPropval<'a> {
    /// Create a propval whose type is taken from the tag.
    ///
    /// Fails if the value kind does not match the type encoded in the tag.
    ///
    /// ```rust
    /// use exmdb::structures::TaggedPropval;
    ///
    /// assert!(TaggedPropval::new(0x3001001F, "Inbox").is_ok());
    /// assert!(TaggedPropval::new(0x3001001F, 7u32).is_err());
    /// ```
    pub fn new(tag: u32, value: impl Into<PropValue<'a>>) -> Result<Self, ValueError> {
        Self::with_type(tag, PropType::tag_code(tag), value)
    }

    /// Create a propval with an explicit type, for tags whose type bits are unspecified.
    pub fn with_type(
        tag: u32,
        type_code: u16,
        value: impl Into<PropValue<'a>>,
    ) -> Result<Self, ValueError> {
        let prop_type = PropType::try_from(type_code)?;
        let value = value.into();
        let tag_code = PropType::tag_code(tag);
        if (tag_code != 0 && tag_code != type_code) || !value.accepts(prop_type) {
            return Err(ValueError::TypeMismatch {
                prop_type: prop_type.name(),
                value: value.kind(),
            });
        }
        Ok(Self {
            tag,
            prop_type,
            value,
        })
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn prop_type(&self) -> PropType {
        self.prop_type
    }

    pub fn value(&self) -> &PropValue<'a> {
        &self.value
    }

    pub fn type_name(&self) -> &'static str {
        self.prop_type.name()
    }

    /// Number of values: element count for arrays, byte count for binaries, 1 otherwise.
    pub fn count(&self) -> usize {
        match &self.value {
            PropValue::Binary(v) => v.len(),
            PropValue::ShortArray(v) => v.len(),
            PropValue::LongArray(v) => v.len(),
            PropValue::LongLongArray(v) => v.len(),
            PropValue::FloatArray(v) => v.len(),
            PropValue::DoubleArray(v) => v.len(),
            PropValue::StringArray(v) => v.len(),
            PropValue::BinaryArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn binary_data(&self) -> Option<&[u8]> {
        match &self.value {
            PropValue::Binary(v) => Some(&v[..]),
            _ => None,
        }
    }

    pub fn binary_length(&self) -> usize {
        self.binary_data().map_or(0, <[u8]>::len)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropValue::String(v) => Some(&v[..]),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            PropValue::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            PropValue::LongLong(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the payload is owned rather than borrowed from caller memory.
    pub fn is_owned(&self) -> bool {
        match &self.value {
            PropValue::String(v) => matches!(v, Cow::Owned(_)),
            PropValue::Binary(v) => matches!(v, Cow::Owned(_)),
            PropValue::ShortArray(v) => matches!(v, Cow::Owned(_)),
            PropValue::LongArray(v) => matches!(v, Cow::Owned(_)),
            PropValue::LongLongArray(v) => matches!(v, Cow::Owned(_)),
            PropValue::FloatArray(v) => matches!(v, Cow::Owned(_)),
            PropValue::DoubleArray(v) => matches!(v, Cow::Owned(_)),
            PropValue::StringArray(v) => v.iter().all(|s| matches!(s, Cow::Owned(_))),
            PropValue::BinaryArray(v) => v.iter().all(|b| matches!(b, Cow::Owned(_))),
            _ => true,
        }
    }

    /// Deep copy any borrowed payload, detaching the value from its source.
    pub fn into_owned(self) -> TaggedPropval<'static> {
        let value = match self.value {
            PropValue::Byte(v) => PropValue::Byte(v),
            PropValue::Short(v) => PropValue::Short(v),
            PropValue::Long(v) => PropValue::Long(v),
            PropValue::LongLong(v) => PropValue::LongLong(v),
            PropValue::Float(v) => PropValue::Float(v),
            PropValue::Double(v) => PropValue::Double(v),
            PropValue::String(v) => PropValue::String(Cow::Owned(v.into_owned())),
            PropValue::Binary(v) => PropValue::Binary(Cow::Owned(v.into_owned())),
            PropValue::ShortArray(v) => PropValue::ShortArray(Cow::Owned(v.into_owned())),
            PropValue::LongArray(v) => PropValue::LongArray(Cow::Owned(v.into_owned())),
            PropValue::LongLongArray(v) => PropValue::LongLongArray(Cow::Owned(v.into_owned())),
            PropValue::FloatArray(v) => PropValue::FloatArray(Cow::Owned(v.into_owned())),
            PropValue::DoubleArray(v) => PropValue::DoubleArray(Cow::Owned(v.into_owned())),
            PropValue::StringArray(v) => PropValue::StringArray(
                v.into_iter()
                    .map(|s| Cow::Owned(s.into_owned()))
                    .collect(),
            ),
            PropValue::BinaryArray(v) => PropValue::BinaryArray(
                v.into_iter()
                    .map(|b| Cow::Owned(b.into_owned()))
                    .collect(),
            ),
        };
        TaggedPropval {
            tag: self.tag,
            prop_type: self.prop_type,
            value,
        }
    }

    /// Like the [`fmt::Display`] output, but renders FILETIME values as local time.
    pub fn print_value(&self) -> String {
        match (self.prop_type, &self.value) {
            (PropType::FileTime, PropValue::LongLong(ft)) => Local
                .timestamp_opt(util::nx_time(*ft), 0)
                .single()
                .map(|t| t.format("%a %b %e %H:%M:%S %Y").to_string())
                .unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for TaggedPropval<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            PropValue::Byte(v) => write!(f, "{v}"),
            PropValue::Short(v) => write!(f, "{v}"),
            PropValue::Long(v) => write!(f, "{v}"),
            PropValue::LongLong(v) => write!(f, "{v}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Double(v) => write!(f, "{v}"),
            PropValue::String(v) => f.write_str(v),
            PropValue::Binary(v) => write!(f, "[{} bytes]", v.len()),
            _ => write!(f, "[{} elements]", self.count()),
        }
    }
}

fn push_count(buf: &mut Buffer, len: usize) -> Result<(), SerializationError> {
    let count = u32::try_from(len).map_err(|_| SerializationError::TooMany {
        what: "property value element",
        count: len,
        max: u32::MAX as usize,
    })?;
    buf.push(&count)
}

fn push_binary(buf: &mut Buffer, data: &[u8]) -> Result<(), SerializationError> {
    push_count(buf, data.len())?;
    buf.push_raw(data);
    Ok(())
}

fn pop_binary(buf: &mut Buffer) -> Result<Vec<u8>, SerializationError> {
    let len: u32 = buf.pop()?;
    Ok(buf.pop_raw(len as usize)?.to_vec())
}

impl Push for TaggedPropval<'_> {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&self.tag)?;
        if PropType::tag_code(self.tag) == PropType::Unspecified.code() {
            buf.push(&self.prop_type.code())?;
        }
        match &self.value {
            PropValue::Byte(v) => buf.push(v),
            PropValue::Short(v) => buf.push(v),
            PropValue::Long(v) => buf.push(v),
            PropValue::LongLong(v) => buf.push(v),
            PropValue::Float(v) => buf.push(v),
            PropValue::Double(v) => buf.push(v),
            PropValue::String(v) => buf.push(&v[..]),
            PropValue::Binary(v) => push_binary(buf, v),
            PropValue::ShortArray(v) => buf.push_list32(&v[..]),
            PropValue::LongArray(v) => buf.push_list32(&v[..]),
            PropValue::LongLongArray(v) => buf.push_list32(&v[..]),
            PropValue::FloatArray(v) => buf.push_list32(&v[..]),
            PropValue::DoubleArray(v) => buf.push_list32(&v[..]),
            PropValue::StringArray(v) => {
                push_count(buf, v.len())?;
                v.iter().try_for_each(|s| buf.push(&s[..]))
            }
            PropValue::BinaryArray(v) => {
                push_count(buf, v.len())?;
                v.iter().try_for_each(|b| push_binary(buf, b))
            }
        }
    }
}

impl Pop for TaggedPropval<'static> {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        let tag: u32 = buf.pop()?;
        let code = match PropType::tag_code(tag) {
            0 => buf.pop::<u16>()?,
            code => code,
        };
        let prop_type =
            PropType::try_from(code).map_err(|_| SerializationError::UnknownType(code))?;
        let value = match prop_type {
            PropType::Unspecified => return Err(SerializationError::UnknownType(code)),
            PropType::Byte => PropValue::Byte(buf.pop()?),
            PropType::Short => PropValue::Short(buf.pop()?),
            PropType::Long | PropType::Error => PropValue::Long(buf.pop()?),
            PropType::LongLong | PropType::Currency | PropType::FileTime => {
                PropValue::LongLong(buf.pop()?)
            }
            PropType::Float => PropValue::Float(buf.pop()?),
            PropType::Double | PropType::FloatingTime => PropValue::Double(buf.pop()?),
            PropType::String | PropType::WString => PropValue::String(Cow::Owned(buf.pop()?)),
            PropType::Binary => PropValue::Binary(Cow::Owned(pop_binary(buf)?)),
            PropType::ShortArray => PropValue::ShortArray(Cow::Owned(buf.pop_list32()?)),
            PropType::LongArray => PropValue::LongArray(Cow::Owned(buf.pop_list32()?)),
            PropType::LongLongArray | PropType::CurrencyArray => {
                PropValue::LongLongArray(Cow::Owned(buf.pop_list32()?))
            }
            PropType::FloatArray => PropValue::FloatArray(Cow::Owned(buf.pop_list32()?)),
            PropType::DoubleArray | PropType::FloatingTimeArray => {
                PropValue::DoubleArray(Cow::Owned(buf.pop_list32()?))
            }
            PropType::StringArray | PropType::WStringArray => PropValue::StringArray(
                buf.pop_list32::<String>()?
                    .into_iter()
                    .map(Cow::Owned)
                    .collect(),
            ),
            PropType::BinaryArray => {
                let count: u32 = buf.pop()?;
                let mut items = Vec::with_capacity((count as usize).min(buf.remaining()));
                for _ in 0..count {
                    items.push(Cow::Owned(pop_binary(buf)?));
                }
                PropValue::BinaryArray(items)
            }
        };
        Ok(TaggedPropval {
            tag,
            prop_type,
            value,
        })
    }
}
