//! Client library for the gromox exmdb protocol.
//!
//! The crate is layered bottom-up: [`codec`] handles the primitive wire encoding,
//! [`structures`] the typed values built on it (propvals, restrictions, GUIDs), and
//! [`protocol`] the request catalog and the blocking client. [`queries`] composes common
//! multi-request operations on top.
pub mod codec;
pub mod constants;
pub mod error;
pub mod protocol;
pub mod queries;
pub mod structures;
pub mod util;

pub use error::ExmdbError;
pub use protocol::{ClientConfig, ExmdbClient, Request};
pub use structures::{Restriction, TaggedPropval};
