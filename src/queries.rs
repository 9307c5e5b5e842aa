//! Higher-level store operations composed from primitive requests.
//!
//! [`Queries`] borrows a client for the duration of a batch of calls:
//!
//! ```rust,no_run
//! use exmdb::{ClientConfig, ExmdbClient, queries::{DEFAULT_FOLDER_PROPS, FolderList, Queries}};
//!
//! let mut client = ExmdbClient::connect(ClientConfig::new("localhost", 5000, "/var/lib/gromox/domain"))?;
//! let table = Queries::new(&mut client).folder_list("/var/lib/gromox/domain/1", &DEFAULT_FOLDER_PROPS)?;
//! for folder in FolderList::from(&table[..]).folders {
//!     println!("{} {}", folder.folder_id, folder.display_name);
//! }
//! # Ok::<(), exmdb::ExmdbError>(())
//! ```
use std::collections::HashMap;

use log::debug;

use crate::{
    codec::Buffer,
    constants::{delete_flags, folder_type, public_fid, tags},
    error::ExmdbError,
    protocol::{Connector, ExmdbClient, TcpConnector, request::*, response::LoadTableResponse},
    structures::{Guid, Op, PermissionData, PropertyProblem, Restriction, SizedXid, TaggedPropval},
    util::{make_eid_ex, nt_now, value_to_gc},
};

pub type PropvalTable = Vec<Vec<TaggedPropval<'static>>>;

/// Member rights granting full control of a folder.
pub const OWNER_RIGHTS: u32 = 0x0000_07e3;

/// Columns interpreted by [`Folder`].
pub const DEFAULT_FOLDER_PROPS: [u32; 5] = [
    tags::FOLDERID,
    tags::DISPLAYNAME,
    tags::COMMENT,
    tags::CREATIONTIME,
    tags::CONTAINERCLASS,
];

/// Display name of the message holding a device's sync state.
const DEVICE_DATA: &str = "devicedata";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Folder {
    pub folder_id: u64,
    pub display_name: String,
    pub comment: String,
    pub creation_time: u64,
    pub container: String,
}

impl From<&[TaggedPropval<'_>]> for Folder {
    fn from(propvals: &[TaggedPropval<'_>]) -> Self {
        let mut folder = Folder::default();
        for tp in propvals {
            match tp.tag() {
                tags::FOLDERID => folder.folder_id = tp.as_u64().unwrap_or_default(),
                tags::DISPLAYNAME => folder.display_name = tp.as_str().unwrap_or_default().into(),
                tags::COMMENT => folder.comment = tp.as_str().unwrap_or_default().into(),
                tags::CREATIONTIME => folder.creation_time = tp.as_u64().unwrap_or_default(),
                tags::CONTAINERCLASS => folder.container = tp.as_str().unwrap_or_default().into(),
                _ => {}
            }
        }
        folder
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderList {
    pub folders: Vec<Folder>,
}

impl From<&[Vec<TaggedPropval<'static>>]> for FolderList {
    fn from(table: &[Vec<TaggedPropval<'static>>]) -> Self {
        let folders = table.iter().map(|row| Folder::from(&row[..])).collect();
        Self { folders }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Member {
    pub id: u64,
    pub name: String,
    pub rights: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderMemberList {
    pub members: Vec<Member>,
}

impl From<&[Vec<TaggedPropval<'static>>]> for FolderMemberList {
    fn from(table: &[Vec<TaggedPropval<'static>>]) -> Self {
        let members = table
            .iter()
            .map(|row| {
                let mut member = Member::default();
                for tp in row {
                    match tp.tag() {
                        tags::MEMBERID => member.id = tp.as_u64().unwrap_or_default(),
                        tags::MEMBERNAME => member.name = tp.as_str().unwrap_or_default().into(),
                        tags::MEMBERRIGHTS => member.rights = tp.as_u32().unwrap_or_default(),
                        _ => {}
                    }
                }
                member
            })
            .collect();
        Self { members }
    }
}

pub struct Queries<'c, C: Connector = TcpConnector> {
    client: &'c mut ExmdbClient<C>,
}

impl<'c, C: Connector> Queries<'c, C> {
    pub fn new(client: &'c mut ExmdbClient<C>) -> Self {
        Self { client }
    }

    /// Public folders directly below the IPM subtree of a domain store.
    pub fn folder_list(
        &mut self,
        homedir: &str,
        proptags: &[u32],
    ) -> Result<PropvalTable, ExmdbError> {
        let folder_id = make_eid_ex(1, public_fid::IPMSUBTREE);
        self.query_hierarchy(homedir, folder_id, proptags)
    }

    /// Create a public folder and return its id.
    pub fn create_folder(
        &mut self,
        homedir: &str,
        domain_id: u32,
        name: &str,
        container: &str,
        comment: &str,
    ) -> Result<u64, ExmdbError> {
        let change_num = self.client.send(&AllocateCn { homedir })?.change_num;
        let now = nt_now();
        let xid = SizedXid::new(22, Guid::from_domain_id(domain_id), value_to_gc(change_num));

        let mut tmp = Buffer::new();
        xid.write_xid(&mut tmp)?;
        let change_key = tmp.as_bytes().to_vec();
        tmp.clear();
        tmp.push(&xid)?;
        let predecessors = tmp.as_bytes().to_vec();

        let mut propvals = vec![
            TaggedPropval::new(tags::PARENTFOLDERID, make_eid_ex(1, public_fid::IPMSUBTREE))?,
            TaggedPropval::new(tags::FOLDERTYPE, folder_type::GENERIC)?,
            TaggedPropval::new(tags::DISPLAYNAME, name)?,
            TaggedPropval::new(tags::COMMENT, comment)?,
            TaggedPropval::new(tags::CREATIONTIME, now)?,
            TaggedPropval::new(tags::LASTMODIFICATIONTIME, now)?,
            TaggedPropval::new(tags::CHANGENUMBER, change_num)?,
            TaggedPropval::new(tags::CHANGEKEY, change_key)?,
            TaggedPropval::new(tags::PREDECESSORCHANGELIST, predecessors)?,
        ];
        if !container.is_empty() {
            propvals.push(TaggedPropval::new(tags::CONTAINERCLASS, container)?);
        }

        let folder_id = self
            .client
            .send(&CreateFolderByProperties {
                homedir,
                cpid: 0,
                propvals: &propvals,
            })?
            .folder_id;
        debug!("Created folder {name:?} with id {folder_id:#x}");
        Ok(folder_id)
    }

    /// Hard-delete a folder. Returns whether the server reported success.
    pub fn delete_folder(&mut self, homedir: &str, folder_id: u64) -> Result<bool, ExmdbError> {
        let response = self.client.send(&DeleteFolder {
            homedir,
            cpid: 0,
            folder_id,
            hard: true,
        })?;
        Ok(response.success)
    }

    pub fn folder_member_list(
        &mut self,
        homedir: &str,
        folder_id: u64,
    ) -> Result<PropvalTable, ExmdbError> {
        let table = self.client.send(&LoadPermissionTable {
            homedir,
            folder_id,
            table_flags: 0,
        })?;
        self.query_and_unload(
            homedir,
            table,
            &[tags::MEMBERID, tags::MEMBERNAME, tags::MEMBERRIGHTS],
        )
    }

    /// Add a member, or modify the member with the given id when it is not zero.
    pub fn set_folder_member(
        &mut self,
        homedir: &str,
        folder_id: u64,
        username: &str,
        rights: u32,
        member_id: u64,
    ) -> Result<(), ExmdbError> {
        let mut propvals = vec![
            TaggedPropval::new(tags::SMTPADDRESS, username)?,
            TaggedPropval::new(tags::MEMBERRIGHTS, rights)?,
        ];
        let flags = if member_id != 0 {
            propvals.push(TaggedPropval::new(tags::MEMBERID, member_id)?);
            PermissionData::MODIFY_ROW
        } else {
            PermissionData::ADD_ROW
        };
        self.update_permissions(homedir, folder_id, PermissionData::new(flags, propvals))
    }

    pub fn delete_folder_member(
        &mut self,
        homedir: &str,
        folder_id: u64,
        member_id: u64,
    ) -> Result<(), ExmdbError> {
        let propvals = vec![TaggedPropval::new(tags::MEMBERID, member_id)?];
        self.update_permissions(
            homedir,
            folder_id,
            PermissionData::new(PermissionData::REMOVE_ROW, propvals),
        )
    }

    fn update_permissions(
        &mut self,
        homedir: &str,
        folder_id: u64,
        permission: PermissionData<'_>,
    ) -> Result<(), ExmdbError> {
        self.client.send(&UpdateFolderPermission {
            homedir,
            folder_id,
            freebusy: false,
            permissions: &[permission],
        })?;
        Ok(())
    }

    pub fn store_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        proptags: &[u32],
    ) -> Result<Vec<TaggedPropval<'static>>, ExmdbError> {
        let response = self.client.send(&GetStoreProperties {
            homedir,
            cpid,
            proptags,
        })?;
        Ok(response.propvals)
    }

    pub fn set_store_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<Vec<PropertyProblem>, ExmdbError> {
        let response = self.client.send(&SetStoreProperties {
            homedir,
            cpid,
            propvals,
        })?;
        Ok(response.problems)
    }

    pub fn remove_store_properties(
        &mut self,
        homedir: &str,
        proptags: &[u32],
    ) -> Result<(), ExmdbError> {
        self.client
            .send(&RemoveStoreProperties { homedir, proptags })?;
        Ok(())
    }

    pub fn all_store_properties(&mut self, homedir: &str) -> Result<Vec<u32>, ExmdbError> {
        Ok(self.client.send(&GetAllStoreProperties { homedir })?.proptags)
    }

    pub fn folder_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        folder_id: u64,
        proptags: &[u32],
    ) -> Result<Vec<TaggedPropval<'static>>, ExmdbError> {
        let response = self.client.send(&GetFolderProperties {
            homedir,
            cpid,
            folder_id,
            proptags,
        })?;
        Ok(response.propvals)
    }

    pub fn set_folder_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        folder_id: u64,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<Vec<PropertyProblem>, ExmdbError> {
        let response = self.client.send(&SetFolderProperties {
            homedir,
            cpid,
            folder_id,
            propvals,
        })?;
        Ok(response.problems)
    }

    pub fn unload_store(&mut self, homedir: &str) -> Result<(), ExmdbError> {
        self.client.send(&UnloadStore { homedir })?;
        Ok(())
    }

    /// Sync state of every device below `folder_name`, keyed by device folder name.
    ///
    /// Devices without a readable state message are left out.
    pub fn sync_data(
        &mut self,
        homedir: &str,
        folder_name: &str,
    ) -> Result<HashMap<String, String>, ExmdbError> {
        let parent_id = make_eid_ex(1, public_fid::ROOT);
        let folder = self.client.send(&GetFolderByName {
            homedir,
            parent_id,
            name: folder_name,
        })?;
        let devices =
            self.query_hierarchy(homedir, folder.folder_id, &[tags::FOLDERID, tags::DISPLAYNAME])?;

        let mut data = HashMap::with_capacity(devices.len());
        for device in &devices {
            let [id, name] = &device[..] else {
                continue;
            };
            if id.tag() != tags::FOLDERID || name.tag() != tags::DISPLAYNAME {
                continue;
            }
            let (Some(folder_id), Some(name)) = (id.as_u64(), name.as_str()) else {
                continue;
            };
            if let Some(body) = self.device_data(homedir, folder_id)? {
                data.insert(name.to_owned(), body);
            }
        }
        Ok(data)
    }

    fn device_data(&mut self, homedir: &str, folder_id: u64) -> Result<Option<String>, ExmdbError> {
        let filter = Restriction::property(
            Op::Eq,
            0,
            TaggedPropval::new(tags::DISPLAYNAME, DEVICE_DATA)?,
        );
        let table = self.client.send(&LoadContentTable {
            homedir,
            cpid: 0,
            folder_id,
            username: "",
            table_flags: 2,
            restriction: filter,
        })?;
        let rows = self.query_and_unload(homedir, table, &[tags::MID])?;

        let message_id = match rows.first().map(Vec::as_slice) {
            Some([mid]) if mid.tag() == tags::MID => mid.as_u64(),
            _ => None,
        };
        let Some(message_id) = message_id else {
            return Ok(None);
        };

        let message = self.client.send(&GetMessageProperties {
            homedir,
            username: "",
            cpid: 0,
            message_id,
            proptags: &[tags::BODY],
        })?;
        Ok(match &message.propvals[..] {
            [body] if body.tag() == tags::BODY => body.as_str().map(str::to_owned),
            _ => None,
        })
    }

    /// Clear a device's sync folder so the device performs a full resync.
    pub fn resync_device(
        &mut self,
        homedir: &str,
        folder_name: &str,
        device_id: &str,
    ) -> Result<(), ExmdbError> {
        let parent_id = make_eid_ex(1, public_fid::ROOT);
        let sync_folder = self.client.send(&GetFolderByName {
            homedir,
            parent_id,
            name: folder_name,
        })?;
        let device_folder = self.client.send(&GetFolderByName {
            homedir,
            parent_id: sync_folder.folder_id,
            name: device_id,
        })?;
        self.client.send(&EmptyFolder {
            homedir,
            cpid: 0,
            username: "",
            folder_id: device_folder.folder_id,
            flags: delete_flags::DEL_MESSAGES | delete_flags::DEL_FOLDERS,
        })?;
        Ok(())
    }

    fn query_hierarchy(
        &mut self,
        homedir: &str,
        folder_id: u64,
        proptags: &[u32],
    ) -> Result<PropvalTable, ExmdbError> {
        let table = self.client.send(&LoadHierarchyTable {
            homedir,
            folder_id,
            username: "",
            table_flags: 0,
            restriction: Restriction::null(),
        })?;
        self.query_and_unload(homedir, table, proptags)
    }

    /// Read every row of a loaded table, then release it.
    fn query_and_unload(
        &mut self,
        homedir: &str,
        table: LoadTableResponse,
        proptags: &[u32],
    ) -> Result<PropvalTable, ExmdbError> {
        let rows = self.client.send(&QueryTable {
            homedir,
            username: "",
            cpid: 0,
            table_id: table.table_id,
            proptags,
            start: 0,
            count: table.row_count,
        })?;
        self.client.send(&UnloadTable {
            homedir,
            table_id: table.table_id,
        })?;
        Ok(rows.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ClientConfig,
        codec::Push,
        protocol::mock::{MockConnector, ok},
    };

    fn client(responses: &[Vec<u8>]) -> (MockConnector, ExmdbClient<MockConnector>) {
        let mut script = ok(&[]);
        for response in responses {
            script.extend_from_slice(response);
        }
        let connector = MockConnector::new([script]);
        let client =
            ExmdbClient::with_connector(connector.clone(), ClientConfig::new("h", 1, "/d")).unwrap();
        (connector, client)
    }

    fn payload<T: Push + ?Sized>(value: &T) -> Vec<u8> {
        let mut buf = Buffer::new();
        buf.push(value).unwrap();
        ok(buf.as_bytes())
    }

    fn table(rows: &[Vec<TaggedPropval<'static>>]) -> Vec<u8> {
        let mut buf = Buffer::new();
        buf.push(&(rows.len() as u32)).unwrap();
        for row in rows {
            buf.push_list16(row).unwrap();
        }
        ok(buf.as_bytes())
    }

    /// Call ids of the requests sent after the handshake.
    fn call_ids(written: &[u8]) -> Vec<u8> {
        let mut ids = Vec::new();
        let mut pos = 0;
        while pos < written.len() {
            let len = u32::from_le_bytes(written[pos..pos + 4].try_into().unwrap()) as usize;
            ids.push(written[pos + 4]);
            pos += 4 + len;
        }
        ids.remove(0);
        ids
    }

    fn tp<'a>(tag: u32, value: impl Into<crate::structures::PropValue<'a>>) -> TaggedPropval<'a> {
        TaggedPropval::new(tag, value).unwrap()
    }

    #[test]
    fn folder_list() {
        let (connector, mut client) = client(&[
            payload(&(4u32, 1u32)),
            table(&[vec![tp(tags::FOLDERID, 9u64), tp(tags::DISPLAYNAME, "Shared".to_string())]]),
            ok(&[]),
        ]);

        let rows = Queries::new(&mut client)
            .folder_list("/d", &DEFAULT_FOLDER_PROPS)
            .unwrap();
        let list = FolderList::from(&rows[..]);
        assert_eq!(list.folders.len(), 1);
        assert_eq!(list.folders[0].folder_id, 9);
        assert_eq!(list.folders[0].display_name, "Shared");
        assert_eq!(call_ids(&connector.written(0)), vec![0x26, 0x2f, 0x2d]);
    }

    #[test]
    fn create_folder() {
        let (connector, mut client) = client(&[
            payload(&0x42u64),
            payload(&0x1234u64),
        ]);

        let id = Queries::new(&mut client)
            .create_folder("/d", 7, "Projects", "IPF.Note", "")
            .unwrap();
        assert_eq!(id, 0x1234);

        let written = connector.written(0);
        assert_eq!(call_ids(&written), vec![0x5e, 0x15]);
        let needle = tags::CONTAINERCLASS.to_le_bytes();
        assert!(written.windows(4).any(|w| w == needle));
    }

    #[test]
    fn create_folder_change_key() {
        let (connector, mut client) = client(&[payload(&0x42u64), payload(&1u64)]);
        Queries::new(&mut client)
            .create_folder("/d", 7, "Projects", "", "")
            .unwrap();

        let mut expected = tags::CHANGEKEY.to_le_bytes().to_vec();
        expected.extend(22u32.to_le_bytes());
        expected.extend(7u32.to_le_bytes());
        let written = connector.written(0);
        assert!(
            written
                .windows(expected.len())
                .any(|w| w == &expected[..])
        );
        let needle = tags::CONTAINERCLASS.to_le_bytes();
        assert!(!written.windows(4).any(|w| w == needle));
    }

    #[test]
    fn members() {
        let (connector, mut client) = client(&[
            payload(&(2u32, 1u32)),
            table(&[vec![
                tp(tags::MEMBERID, 3u64),
                tp(tags::MEMBERNAME, "user@example.org".to_string()),
                tp(tags::MEMBERRIGHTS, OWNER_RIGHTS),
            ]]),
            ok(&[]),
            ok(&[]),
        ]);
        let mut queries = Queries::new(&mut client);

        let rows = queries.folder_member_list("/d", 5).unwrap();
        let list = FolderMemberList::from(&rows[..]);
        assert_eq!(
            list.members,
            vec![Member {
                id: 3,
                name: "user@example.org".into(),
                rights: OWNER_RIGHTS
            }]
        );

        queries
            .set_folder_member("/d", 5, "other@example.org", 0x400, 0)
            .unwrap();
        let written = connector.written(0);
        assert_eq!(call_ids(&written), vec![0x2b, 0x2f, 0x2d, 0x6c]);
        // row flags are followed by two propvals: address and rights
        let row = written.len() - (2 + 4 + "other@example.org".len() + 1 + 4 + 4) - 1;
        assert_eq!(written[row], PermissionData::ADD_ROW);
        assert_eq!(&written[row - 2..row], &[1, 0]);
        // no freebusy update
        assert_eq!(written[row - 3], 0);
        assert_eq!(&written[row - 11..row - 3], &5u64.to_le_bytes());
    }

    #[test]
    fn sync_data() {
        let (connector, mut client) = client(&[
            payload(&100u64),
            payload(&(1u32, 3u32)),
            table(&[
                vec![tp(tags::FOLDERID, 11u64), tp(tags::DISPLAYNAME, "phone".to_string())],
                vec![tp(tags::FOLDERID, 12u64)],
                vec![tp(tags::FOLDERID, 13u64), tp(tags::DISPLAYNAME, "tablet".to_string())],
            ]),
            ok(&[]),
            // phone
            payload(&(2u32, 1u32)),
            table(&[vec![tp(tags::MID, 21u64)]]),
            ok(&[]),
            payload(&(1u16, tp(tags::BODY, "state".to_string()))),
            // tablet has no device data message
            payload(&(3u32, 0u32)),
            table(&[]),
            ok(&[]),
        ]);

        let data = Queries::new(&mut client).sync_data("/d", "GS-SyncState").unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("phone").map(String::as_str), Some("state"));
        assert_eq!(
            call_ids(&connector.written(0)),
            vec![0x13, 0x26, 0x2f, 0x2d, 0x28, 0x2f, 0x2d, 0x59, 0x28, 0x2f, 0x2d]
        );
    }

    #[test]
    fn resync_device() {
        let (connector, mut client) = client(&[payload(&100u64), payload(&200u64), payload(&false)]);
        Queries::new(&mut client)
            .resync_device("/d", "GS-SyncState", "phone")
            .unwrap();

        let written = connector.written(0);
        assert_eq!(call_ids(&written), vec![0x13, 0x13, 0x1b]);
        let flags = u32::from_le_bytes(written[written.len() - 4..].try_into().unwrap());
        assert_eq!(flags, delete_flags::DEL_MESSAGES | delete_flags::DEL_FOLDERS);
        let folder_id = &written[written.len() - 12..written.len() - 4];
        assert_eq!(folder_id, &200u64.to_le_bytes());
    }

    #[test]
    fn protocol_errors_propagate() {
        let (_, mut client) = client(&[vec![1]]);
        let err = Queries::new(&mut client).unload_store("/d").unwrap_err();
        assert_eq!(err.code(), Some(1));
    }

    #[test]
    fn folder_from_propvals() {
        let propvals = [
            tp(tags::COMMENT, "note"),
            tp(tags::CONTAINERCLASS, "IPF.Contact"),
            tp(tags::CREATIONTIME, 5u64),
        ];
        let folder = Folder::from(&propvals[..]);
        assert_eq!(folder.comment, "note");
        assert_eq!(folder.container, "IPF.Contact");
        assert_eq!(folder.creation_time, 5);
        assert_eq!(folder.folder_id, 0);
    }
}
