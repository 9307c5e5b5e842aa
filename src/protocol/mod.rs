//! Client side of the exmdb protocol.
//!
//! Requests are plain structs implementing [`Request`], each tied to its response type at
//! compile time. The [`ExmdbClient`] frames them, ships them over a [`Connector`]'s
//! stream and decodes whatever comes back.
//!
//! # Binary Format
//!
//! - A request is a 4-byte little-endian length followed by that many bytes: the call id,
//!   then the call arguments. All calls except the handshake start with the store home
//!   directory.
//! - A response starts with a status byte. Zero is followed by a 4-byte length and the
//!   payload, anything else is the whole response and surfaces as a
//!   [`ProtocolError`](crate::error::ProtocolError).
//!
//! Exchanges are strictly sequential. There is no multiplexing and no pipelining.
//!
//! # Example
//! ```rust,no_run
//! use exmdb::protocol::{ClientConfig, ExmdbClient, request::AllocateCn};
//!
//! let mut client = ExmdbClient::connect(ClientConfig::new("localhost", 5000, "/var/lib/gromox/user"))?;
//! let cn = client.send(&AllocateCn { homedir: "/var/lib/gromox/user/1" })?.change_num;
//! # Ok::<(), exmdb::ExmdbError>(())
//! ```
mod client;
pub mod request;
pub mod response;
mod transport;

pub use client::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, ExmdbClient, flags};
pub use request::Request;
pub use transport::{Connector, ProtocolTransport, TcpConnector};

#[cfg(test)]
pub(crate) use transport::mock;
