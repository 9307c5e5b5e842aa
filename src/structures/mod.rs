//! Wire structures shared by requests and responses.
//!
//! The central type is [`TaggedPropval`], a property tag paired with a dynamically typed
//! value. Everything else here is either a fixed-layout record ([`Guid`],
//! [`PropertyProblem`]) or a composite built out of propvals ([`Restriction`],
//! [`PermissionData`], [`MessageContent`]).
mod guid;
mod message;
mod property;
mod propval;
pub mod restriction;

pub use error::ValueError;
pub use guid::{Guid, SizedXid};
pub use message::{AttachmentContent, MessageContent};
pub use property::{PermissionData, PropertyName, PropertyProblem};
pub use propval::{PropType, PropValue, TaggedPropval, type_name};
pub use restriction::{Op, Restriction};

pub mod error {
    use thiserror::Error;

    /// Raised when a value is constructed from inconsistent parts, before any I/O happens.
    #[derive(Debug, Error)]
    pub enum ValueError {
        #[error("cannot construct {prop_type} tag from {value}")]
        TypeMismatch {
            prop_type: &'static str,
            value: &'static str,
        },

        #[error("unknown property type {0:#06x}")]
        UnknownType(u16),

        #[error("failed to parse guid '{input}': {source}")]
        Guid {
            input: String,
            #[source]
            source: uuid::Error,
        },

        #[error("comment restriction needs 1 to 255 propvals, got {0}")]
        CommentCount(usize),
    }
}
