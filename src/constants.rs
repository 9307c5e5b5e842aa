//! Protocol constants: call ids, property tags and well-known folder ids.

/// RPC call identifiers, the first byte of every request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallId {
    Connect = 0x00,
    GetNamedPropIds = 0x04,
    GetStoreAllProptags = 0x08,
    GetStoreProperties = 0x09,
    SetStoreProperties = 0x0a,
    RemoveStoreProperties = 0x0b,
    QueryFolderMessages = 0x11,
    GetFolderByName = 0x13,
    CreateFolderByProperties = 0x15,
    GetFolderAllProptags = 0x16,
    GetFolderProperties = 0x17,
    SetFolderProperties = 0x18,
    DeleteFolder = 0x1a,
    EmptyFolder = 0x1b,
    DeleteMessages = 0x23,
    LoadHierarchyTable = 0x26,
    LoadContentTable = 0x28,
    LoadPermissionTable = 0x2b,
    UnloadTable = 0x2d,
    QueryTable = 0x2f,
    LoadMessageInstance = 0x3b,
    ReadMessageInstance = 0x40,
    UnloadInstance = 0x48,
    GetInstanceProperties = 0x4a,
    GetMessageInstanceRcpts = 0x51,
    QueryMessageInstanceAttachmentTable = 0x56,
    GetMessageProperties = 0x59,
    AllocateCn = 0x5e,
    UpdateFolderPermission = 0x6c,
    ReadMessage = 0x71,
    UnloadStore = 0x80,
}

impl From<CallId> for u8 {
    fn from(value: CallId) -> Self {
        value as u8
    }
}

/// Property tags used by the client and its query helpers.
pub mod tags {
    pub const BODY: u32 = 0x1000001F;
    pub const DISPLAYNAME: u32 = 0x3001001F;
    pub const COMMENT: u32 = 0x3004001F;
    pub const CREATIONTIME: u32 = 0x30070040;
    pub const LASTMODIFICATIONTIME: u32 = 0x30080040;
    pub const FOLDERTYPE: u32 = 0x36010003;
    pub const CONTAINERCLASS: u32 = 0x3613001F;
    pub const SMTPADDRESS: u32 = 0x39FE001F;
    pub const CHANGEKEY: u32 = 0x65E20102;
    pub const PREDECESSORCHANGELIST: u32 = 0x65E30102;
    pub const MEMBERID: u32 = 0x66710014;
    pub const MEMBERNAME: u32 = 0x6672001F;
    pub const MEMBERRIGHTS: u32 = 0x66730003;
    pub const FOLDERID: u32 = 0x67480014;
    pub const PARENTFOLDERID: u32 = 0x67490014;
    pub const MID: u32 = 0x674A0014;
    pub const CHANGENUMBER: u32 = 0x67A40014;
}

/// Counter values of the fixed public store folders.
pub mod public_fid {
    pub const ROOT: u64 = 0x01;
    pub const IPMSUBTREE: u64 = 0x02;
    pub const NONIPMSUBTREE: u64 = 0x03;
    pub const EFORMSREGISTRY: u64 = 0x04;
}

pub mod folder_type {
    pub const ROOT: u32 = 0;
    pub const GENERIC: u32 = 1;
    pub const SEARCH: u32 = 2;
}

/// Flags of [`EmptyFolder`](crate::protocol::request::EmptyFolder).
pub mod delete_flags {
    pub const DEL_MESSAGES: u32 = 0x01;
    pub const DEL_FOLDERS: u32 = 0x04;
    pub const DEL_ASSOCIATED: u32 = 0x08;
    pub const HARD_DELETE: u32 = 0x10;
    pub const ALL: u32 = DEL_MESSAGES | DEL_FOLDERS | DEL_ASSOCIATED | HARD_DELETE;
}

/// Table loading flags.
pub mod table_flags {
    pub const ASSOCIATED: u8 = 0x02;
    pub const DEPTH: u8 = 0x04;
    pub const SOFTDELETES: u8 = 0x20;
}
