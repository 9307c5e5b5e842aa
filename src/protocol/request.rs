//! Request catalog.
//!
//! Every exmdb call is a struct implementing [`Request`]: it knows its call id, how to
//! serialize its arguments and, through [`Request::Response`], which response type the
//! server answers with. All calls except [`Connect`] start with the home directory of
//! the store they operate on.
//!
//! Property tag and propval lists carry a 2-byte count unless noted otherwise.
use rand::Rng;

use super::response::*;
use crate::{
    codec::{Buffer, Pop, SerializationError},
    constants::CallId,
    structures::{PermissionData, PropertyName, Restriction, TaggedPropval},
};

const SESSION_ID_LENGTH: usize = 15;
const SESSION_ID_CHARS: &[u8] = b"0123456789abcdefghjklmnopqrstvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub trait Request {
    const CALL_ID: CallId;
    type Response: Pop;

    /// Serialize the call arguments following the call id.
    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError>;

    fn write(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&u8::from(Self::CALL_ID))?;
        self.write_args(buf)
    }
}

/// Attach a restriction as presence byte plus body.
fn push_restriction(buf: &mut Buffer, res: &Restriction<'_>) -> Result<(), SerializationError> {
    buf.push(&(!res.is_null(), res))
}

/// Random session id sent with the handshake.
pub fn session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LENGTH)
        .map(|_| char::from(SESSION_ID_CHARS[rng.random_range(0..SESSION_ID_CHARS.len())]))
        .collect()
}

/// Handshake binding the connection to a store prefix.
#[derive(Debug, Clone)]
pub struct Connect<'a> {
    pub prefix: &'a str,
    pub session_id: String,
    pub is_private: bool,
}

impl<'a> Connect<'a> {
    pub fn new(prefix: &'a str, is_private: bool) -> Self {
        Self {
            prefix,
            session_id: session_id(),
            is_private,
        }
    }
}

impl Request for Connect<'_> {
    const CALL_ID: CallId = CallId::Connect;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.prefix, self.session_id.as_str(), self.is_private))
    }
}

/// Resolve named properties to property ids, optionally creating missing ones.
#[derive(Debug, Clone)]
pub struct GetNamedPropIds<'a> {
    pub homedir: &'a str,
    pub create: bool,
    pub names: &'a [PropertyName],
}

impl Request for GetNamedPropIds<'_> {
    const CALL_ID: CallId = CallId::GetNamedPropIds;
    type Response = PropIdsResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.create))?;
        buf.push_list16(self.names)
    }
}

#[derive(Debug, Clone)]
pub struct GetAllStoreProperties<'a> {
    pub homedir: &'a str,
}

impl Request for GetAllStoreProperties<'_> {
    const CALL_ID: CallId = CallId::GetStoreAllProptags;
    type Response = ProptagResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(self.homedir)
    }
}

#[derive(Debug, Clone)]
pub struct GetStoreProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub proptags: &'a [u32],
}

impl Request for GetStoreProperties<'_> {
    const CALL_ID: CallId = CallId::GetStoreProperties;
    type Response = PropvalResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.cpid))?;
        buf.push_list16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct SetStoreProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetStoreProperties<'_> {
    const CALL_ID: CallId = CallId::SetStoreProperties;
    type Response = ProblemsResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.cpid))?;
        buf.push_list16(self.propvals)
    }
}

#[derive(Debug, Clone)]
pub struct RemoveStoreProperties<'a> {
    pub homedir: &'a str,
    pub proptags: &'a [u32],
}

impl Request for RemoveStoreProperties<'_> {
    const CALL_ID: CallId = CallId::RemoveStoreProperties;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(self.homedir)?;
        buf.push_list16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct QueryFolderMessages<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
}

impl Request for QueryFolderMessages<'_> {
    const CALL_ID: CallId = CallId::QueryFolderMessages;
    type Response = TableResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.folder_id))
    }
}

/// Look up a subfolder by display name.
#[derive(Debug, Clone)]
pub struct GetFolderByName<'a> {
    pub homedir: &'a str,
    pub parent_id: u64,
    pub name: &'a str,
}

impl Request for GetFolderByName<'_> {
    const CALL_ID: CallId = CallId::GetFolderByName;
    type Response = FolderResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.parent_id, self.name))
    }
}

#[derive(Debug, Clone)]
pub struct CreateFolderByProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for CreateFolderByProperties<'_> {
    const CALL_ID: CallId = CallId::CreateFolderByProperties;
    type Response = FolderResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.cpid))?;
        buf.push_list16(self.propvals)
    }
}

#[derive(Debug, Clone)]
pub struct GetAllFolderProperties<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
}

impl Request for GetAllFolderProperties<'_> {
    const CALL_ID: CallId = CallId::GetFolderAllProptags;
    type Response = ProptagResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.folder_id))
    }
}

#[derive(Debug, Clone)]
pub struct GetFolderProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub proptags: &'a [u32],
}

impl Request for GetFolderProperties<'_> {
    const CALL_ID: CallId = CallId::GetFolderProperties;
    type Response = PropvalResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.cpid, self.folder_id))?;
        buf.push_list16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct SetFolderProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetFolderProperties<'_> {
    const CALL_ID: CallId = CallId::SetFolderProperties;
    type Response = ProblemsResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.cpid, self.folder_id))?;
        buf.push_list16(self.propvals)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteFolder<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub hard: bool,
}

impl Request for DeleteFolder<'_> {
    const CALL_ID: CallId = CallId::DeleteFolder;
    type Response = SuccessResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.cpid, self.folder_id, self.hard))
    }
}

/// Remove folder contents selected by [`delete_flags`](crate::constants::delete_flags).
#[derive(Debug, Clone)]
pub struct EmptyFolder<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub username: &'a str,
    pub folder_id: u64,
    pub flags: u32,
}

impl Request for EmptyFolder<'_> {
    const CALL_ID: CallId = CallId::EmptyFolder;
    type Response = PartialResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(
            self.homedir,
            self.cpid,
            self.username,
            self.folder_id,
            self.flags,
        ))
    }
}

/// Delete messages from a folder. Message ids carry a 4-byte count.
#[derive(Debug, Clone)]
pub struct DeleteMessages<'a> {
    pub homedir: &'a str,
    pub account_id: u32,
    pub cpid: u32,
    pub username: &'a str,
    pub folder_id: u64,
    pub message_ids: &'a [u64],
    pub hard: bool,
}

impl Request for DeleteMessages<'_> {
    const CALL_ID: CallId = CallId::DeleteMessages;
    type Response = PartialResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(
            self.homedir,
            self.account_id,
            self.cpid,
            self.username,
            self.folder_id,
        ))?;
        buf.push_list32(self.message_ids)?;
        buf.push(&self.hard)
    }
}

/// Load the subfolder table of a folder. Unload it with [`UnloadTable`] when done.
#[derive(Debug, Clone)]
pub struct LoadHierarchyTable<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub username: &'a str,
    pub table_flags: u8,
    pub restriction: Restriction<'a>,
}

impl Request for LoadHierarchyTable<'_> {
    const CALL_ID: CallId = CallId::LoadHierarchyTable;
    type Response = LoadTableResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.folder_id, self.username, self.table_flags))?;
        push_restriction(buf, &self.restriction)
    }
}

/// Load the message table of a folder. Unload it with [`UnloadTable`] when done.
#[derive(Debug, Clone)]
pub struct LoadContentTable<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub username: &'a str,
    pub table_flags: u8,
    pub restriction: Restriction<'a>,
}

impl Request for LoadContentTable<'_> {
    const CALL_ID: CallId = CallId::LoadContentTable;
    type Response = LoadTableResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(
            self.homedir,
            self.cpid,
            self.folder_id,
            self.username,
            self.table_flags,
        ))?;
        push_restriction(buf, &self.restriction)?;
        // no sort order
        buf.push(&0u8)
    }
}

#[derive(Debug, Clone)]
pub struct LoadPermissionTable<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub table_flags: u32,
}

impl Request for LoadPermissionTable<'_> {
    const CALL_ID: CallId = CallId::LoadPermissionTable;
    type Response = LoadTableResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.folder_id, self.table_flags))
    }
}

#[derive(Debug, Clone)]
pub struct UnloadTable<'a> {
    pub homedir: &'a str,
    pub table_id: u32,
}

impl Request for UnloadTable<'_> {
    const CALL_ID: CallId = CallId::UnloadTable;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.table_id))
    }
}

/// Fetch rows from a previously loaded table.
#[derive(Debug, Clone)]
pub struct QueryTable<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub table_id: u32,
    pub proptags: &'a [u32],
    pub start: u32,
    pub count: u32,
}

impl Request for QueryTable<'_> {
    const CALL_ID: CallId = CallId::QueryTable;
    type Response = TableResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.username, self.cpid, self.table_id))?;
        buf.push_list16(self.proptags)?;
        buf.push(&(self.start, self.count))
    }
}

/// Open a message instance. Unload it with [`UnloadInstance`] when done.
#[derive(Debug, Clone)]
pub struct LoadMessageInstance<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub new: bool,
    pub folder_id: u64,
    pub message_id: u64,
}

impl Request for LoadMessageInstance<'_> {
    const CALL_ID: CallId = CallId::LoadMessageInstance;
    type Response = InstanceResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(
            self.homedir,
            self.username,
            self.cpid,
            self.new,
            self.folder_id,
            self.message_id,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct ReadMessageInstance<'a> {
    pub homedir: &'a str,
    pub instance_id: u32,
}

impl Request for ReadMessageInstance<'_> {
    const CALL_ID: CallId = CallId::ReadMessageInstance;
    type Response = MessageContentResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.instance_id))
    }
}

#[derive(Debug, Clone)]
pub struct UnloadInstance<'a> {
    pub homedir: &'a str,
    pub instance_id: u32,
}

impl Request for UnloadInstance<'_> {
    const CALL_ID: CallId = CallId::UnloadInstance;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.instance_id))
    }
}

#[derive(Debug, Clone)]
pub struct GetInstanceProperties<'a> {
    pub homedir: &'a str,
    pub size_limit: u32,
    pub instance_id: u32,
    pub proptags: &'a [u32],
}

impl Request for GetInstanceProperties<'_> {
    const CALL_ID: CallId = CallId::GetInstanceProperties;
    type Response = PropvalResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.size_limit, self.instance_id))?;
        buf.push_list16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct GetMessageInstanceRecipients<'a> {
    pub homedir: &'a str,
    pub instance_id: u32,
    pub row_id: u32,
    pub need_count: u16,
}

impl Request for GetMessageInstanceRecipients<'_> {
    const CALL_ID: CallId = CallId::GetMessageInstanceRcpts;
    type Response = TableResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.instance_id, self.row_id, self.need_count))
    }
}

#[derive(Debug, Clone)]
pub struct QueryMessageInstanceAttachmentsTable<'a> {
    pub homedir: &'a str,
    pub instance_id: u32,
    pub proptags: &'a [u32],
    pub start: u32,
    pub count: u32,
}

impl Request for QueryMessageInstanceAttachmentsTable<'_> {
    const CALL_ID: CallId = CallId::QueryMessageInstanceAttachmentTable;
    type Response = TableResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.instance_id))?;
        buf.push_list16(self.proptags)?;
        buf.push(&(self.start, self.count))
    }
}

#[derive(Debug, Clone)]
pub struct GetMessageProperties<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub message_id: u64,
    pub proptags: &'a [u32],
}

impl Request for GetMessageProperties<'_> {
    const CALL_ID: CallId = CallId::GetMessageProperties;
    type Response = PropvalResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.username, self.cpid, self.message_id))?;
        buf.push_list16(self.proptags)
    }
}

/// Reserve a change number for a new object.
#[derive(Debug, Clone)]
pub struct AllocateCn<'a> {
    pub homedir: &'a str,
}

impl Request for AllocateCn<'_> {
    const CALL_ID: CallId = CallId::AllocateCn;
    type Response = ChangeNumResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(self.homedir)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateFolderPermission<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub freebusy: bool,
    pub permissions: &'a [PermissionData<'a>],
}

impl Request for UpdateFolderPermission<'_> {
    const CALL_ID: CallId = CallId::UpdateFolderPermission;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.folder_id, self.freebusy))?;
        buf.push_list16(self.permissions)
    }
}

#[derive(Debug, Clone)]
pub struct ReadMessage<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub message_id: u64,
}

impl Request for ReadMessage<'_> {
    const CALL_ID: CallId = CallId::ReadMessage;
    type Response = ReadMessageResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(self.homedir, self.username, self.cpid, self.message_id))
    }
}

/// Release server-side resources held for a store.
#[derive(Debug, Clone)]
pub struct UnloadStore<'a> {
    pub homedir: &'a str,
}

impl Request for UnloadStore<'_> {
    const CALL_ID: CallId = CallId::UnloadStore;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(self.homedir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::tags,
        structures::{Op, restriction::fuzzy},
    };

    fn encode<R: Request>(request: &R) -> Vec<u8> {
        let mut buf = Buffer::new();
        buf.start();
        request.write(&mut buf).unwrap();
        buf.finalize().unwrap();
        buf.as_bytes().to_vec()
    }

    #[test]
    fn session_ids() {
        let id = session_id();
        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert!(id.bytes().all(|b| SESSION_ID_CHARS.contains(&b)));
    }

    #[test]
    fn connect_layout() {
        let request = Connect {
            prefix: "/d",
            session_id: "abc".into(),
            is_private: true,
        };
        assert_eq!(
            encode(&request),
            vec![9, 0, 0, 0, 0x00, b'/', b'd', 0, b'a', b'b', b'c', 0, 1]
        );
    }

    #[test]
    fn query_table_layout() {
        let request = QueryTable {
            homedir: "h",
            username: "",
            cpid: 0,
            table_id: 3,
            proptags: &[tags::MID],
            start: 0,
            count: 10,
        };
        assert_eq!(
            encode(&request),
            vec![
                26, 0, 0, 0, 0x2f, b'h', 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 1, 0, 0x14, 0x00, 0x4A,
                0x67, 0, 0, 0, 0, 10, 0, 0, 0
            ]
        );
    }

    #[test]
    fn content_table_restriction() {
        let filter = Restriction::content(
            fuzzy::FULLSTRING,
            0,
            TaggedPropval::new(tags::DISPLAYNAME, "devicedata").unwrap(),
        );
        let with = encode(&LoadContentTable {
            homedir: "h",
            cpid: 0,
            folder_id: 1,
            username: "",
            table_flags: 2,
            restriction: filter,
        });
        let without = encode(&LoadContentTable {
            homedir: "h",
            cpid: 0,
            folder_id: 1,
            username: "",
            table_flags: 2,
            restriction: Restriction::null(),
        });

        // header, call id, homedir, cpid, folder id, username, flags
        let prefix = 4 + 1 + 2 + 4 + 8 + 1 + 1;
        assert_eq!(without.len(), prefix + 2);
        assert_eq!(&without[prefix..], &[0, 0]);
        assert_eq!(with[prefix], 1);
        assert_eq!(with[prefix + 1], 0x03);
        assert_eq!(with.last(), Some(&0));
    }

    #[test]
    fn hierarchy_table_restriction_presence() {
        let bytes = encode(&LoadHierarchyTable {
            homedir: "h",
            folder_id: 1,
            username: "",
            table_flags: 0,
            restriction: Restriction::exist(tags::FOLDERID),
        });
        assert_eq!(&bytes[bytes.len() - 6..], &[1, 0x08, 0x14, 0x00, 0x48, 0x67]);

        let bytes = encode(&LoadHierarchyTable {
            homedir: "h",
            folder_id: 1,
            username: "",
            table_flags: 0,
            restriction: Restriction::property(
                Op::Eq,
                0,
                TaggedPropval::new(tags::FOLDERTYPE, 1u32).unwrap(),
            ),
        });
        assert_eq!(bytes[4 + 1 + 2 + 8 + 1 + 1], 1);
    }

    #[test]
    fn delete_messages_counts() {
        let bytes = encode(&DeleteMessages {
            homedir: "",
            account_id: 0,
            cpid: 0,
            username: "",
            folder_id: 0,
            message_ids: &[5, 6],
            hard: true,
        });
        // 4-byte count before the ids, hard flag last
        let ids = 4 + 1 + 1 + 4 + 4 + 1 + 8;
        assert_eq!(&bytes[ids..ids + 4], &[2, 0, 0, 0]);
        assert_eq!(bytes.len(), ids + 4 + 16 + 1);
        assert_eq!(bytes.last(), Some(&1));
    }
}
