use bincode::{Decode, Encode};

use super::{Guid, TaggedPropval};
use crate::codec::{Buffer, Pop, Push, SerializationError};

const KIND_ID: u8 = 0;
const KIND_NAME: u8 = 1;
const MAX_NAME_LENGTH: usize = 254;

/// Named property descriptor, resolved to a property id by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyName {
    Id { guid: Guid, lid: u32 },
    Name { guid: Guid, name: String },
}

impl PropertyName {
    pub fn id(guid: Guid, lid: u32) -> Self {
        Self::Id { guid, lid }
    }

    pub fn name(guid: Guid, name: impl Into<String>) -> Self {
        Self::Name {
            guid,
            name: name.into(),
        }
    }

    pub fn guid(&self) -> Guid {
        match self {
            Self::Id { guid, .. } | Self::Name { guid, .. } => *guid,
        }
    }
}

impl Push for PropertyName {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        match self {
            Self::Id { guid, lid } => buf.push(&(KIND_ID, guid, lid)),
            Self::Name { guid, name } => {
                if name.len() > MAX_NAME_LENGTH {
                    return Err(SerializationError::TooMany {
                        what: "property name byte",
                        count: name.len(),
                        max: MAX_NAME_LENGTH,
                    });
                }
                // length byte includes the terminator
                buf.push(&(KIND_NAME, guid, name.len() as u8 + 1, name.as_str()))
            }
        }
    }
}

impl Pop for PropertyName {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        let kind: u8 = buf.pop()?;
        let guid: Guid = buf.pop()?;
        match kind {
            KIND_ID => Ok(Self::Id {
                guid,
                lid: buf.pop()?,
            }),
            KIND_NAME => {
                let len: u8 = buf.pop()?;
                let name: String = buf.pop()?;
                if name.len() + 1 != usize::from(len) {
                    return Err(SerializationError::Invalid {
                        what: "property name length",
                        reason: format!("declared {len}, found {}", name.len() + 1),
                    });
                }
                Ok(Self::Name { guid, name })
            }
            _ => Err(SerializationError::Invalid {
                what: "property name kind",
                reason: kind.to_string(),
            }),
        }
    }
}

/// Error reported by the server for one entry of a property list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct PropertyProblem {
    /// Position in the request's property list.
    pub index: u16,
    pub proptag: u32,
    pub err: u32,
}

impl Push for PropertyProblem {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.encode(*self)
    }
}

impl Pop for PropertyProblem {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        buf.decode()
    }
}

/// One row operation of a folder permission update.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionData<'a> {
    pub flags: u8,
    pub propvals: Vec<TaggedPropval<'a>>,
}

impl<'a> PermissionData<'a> {
    pub const ADD_ROW: u8 = 0x01;
    pub const MODIFY_ROW: u8 = 0x02;
    pub const REMOVE_ROW: u8 = 0x04;

    pub fn new(flags: u8, propvals: Vec<TaggedPropval<'a>>) -> Self {
        Self { flags, propvals }
    }
}

impl Push for PermissionData<'_> {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&self.flags)?;
        buf.push_list16(&self.propvals)
    }
}
