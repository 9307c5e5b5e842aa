//! Response payloads.
//!
//! The status byte and length header are consumed by the transport; these types only
//! parse the payload that follows.
use bincode::{Decode, Encode};

use crate::{
    codec::{Buffer, Pop, SerializationError},
    structures::{MessageContent, PropertyProblem, TaggedPropval},
};

/// Response without payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullResponse;

impl Pop for NullResponse {
    fn pop_from(_: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropIdsResponse {
    pub prop_ids: Vec<u16>,
}

impl Pop for PropIdsResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            prop_ids: buf.pop_list16()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProptagResponse {
    pub proptags: Vec<u32>,
}

impl Pop for ProptagResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            proptags: buf.pop_list16()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropvalResponse {
    pub propvals: Vec<TaggedPropval<'static>>,
}

impl Pop for PropvalResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            propvals: buf.pop_list16()?,
        })
    }
}

/// Properties the server refused to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemsResponse {
    pub problems: Vec<PropertyProblem>,
}

impl Pop for ProblemsResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            problems: buf.pop_list16()?,
        })
    }
}

/// Table rows, each a list of propvals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableResponse {
    pub entries: Vec<Vec<TaggedPropval<'static>>>,
}

impl Pop for TableResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        let count: u32 = buf.pop()?;
        let mut entries = Vec::with_capacity((count as usize).min(buf.remaining()));
        for _ in 0..count {
            entries.push(buf.pop_list16()?);
        }
        Ok(Self { entries })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderResponse {
    pub folder_id: u64,
}

impl Pop for FolderResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            folder_id: buf.pop()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl Pop for SuccessResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            success: buf.pop()?,
        })
    }
}

/// Set when the server could only complete part of the operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialResponse {
    pub partial: bool,
}

impl Pop for PartialResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            partial: buf.pop()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub struct LoadTableResponse {
    pub table_id: u32,
    pub row_count: u32,
}

impl Pop for LoadTableResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        buf.decode()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceResponse {
    pub instance_id: u32,
}

impl Pop for InstanceResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            instance_id: buf.pop()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageContentResponse {
    pub content: MessageContent,
}

impl Pop for MessageContentResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            content: buf.pop()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeNumResponse {
    pub change_num: u64,
}

impl Pop for ChangeNumResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        Ok(Self {
            change_num: buf.pop()?,
        })
    }
}

/// Message content, absent when the message does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadMessageResponse {
    pub content: Option<MessageContent>,
}

impl Pop for ReadMessageResponse {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        let content = if buf.pop::<bool>()? {
            Some(buf.pop()?)
        } else {
            None
        };
        Ok(Self { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAYNAME: u32 = 0x3001001F;
    const FOLDERID: u32 = 0x67480014;

    #[test]
    fn folder_id() {
        let mut buf = Buffer::from(0x0102030405060708u64.to_le_bytes().to_vec());
        assert_eq!(buf.pop::<FolderResponse>().unwrap().folder_id, 0x0102030405060708);
    }

    #[test]
    fn table_rows() {
        let mut data = vec![2, 0, 0, 0];
        // row 1: folder id and name
        data.extend([2, 0]);
        data.extend(FOLDERID.to_le_bytes());
        data.extend(9u64.to_le_bytes());
        data.extend(DISPLAYNAME.to_le_bytes());
        data.extend(b"Inbox\0");
        // row 2: empty
        data.extend([0, 0]);

        let table: TableResponse = Buffer::from(data).pop().unwrap();
        assert_eq!(table.entries.len(), 2);
        assert_eq!(table.entries[0][0].as_u64(), Some(9));
        assert_eq!(table.entries[0][1].as_str(), Some("Inbox"));
        assert!(table.entries[1].is_empty());
    }

    #[test]
    fn truncated_table() {
        let mut buf = Buffer::from(vec![1, 0, 0, 0, 1, 0]);
        assert!(matches!(
            buf.pop::<TableResponse>(),
            Err(SerializationError::Underflow { .. })
        ));
    }

    #[test]
    fn load_table() {
        let mut buf = Buffer::from(vec![7, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(
            buf.pop::<LoadTableResponse>().unwrap(),
            LoadTableResponse {
                table_id: 7,
                row_count: 3
            }
        );
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn problems() {
        let mut data = vec![1, 0, 0, 0];
        data.extend(DISPLAYNAME.to_le_bytes());
        data.extend(0x80040102u32.to_le_bytes());

        let problems: ProblemsResponse = Buffer::from(data).pop().unwrap();
        assert_eq!(
            problems.problems,
            vec![PropertyProblem {
                index: 0,
                proptag: DISPLAYNAME,
                err: 0x80040102
            }]
        );
    }

    #[test]
    fn read_message_presence() {
        let absent: ReadMessageResponse = Buffer::from(vec![0]).pop().unwrap();
        assert!(absent.content.is_none());

        let present: ReadMessageResponse =
            Buffer::from(vec![1, 0, 0, 0, 0]).pop().unwrap();
        assert_eq!(present.content, Some(MessageContent::default()));
    }
}
