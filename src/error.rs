use std::io;

use thiserror::Error;

pub use crate::codec::SerializationError;
pub use crate::structures::ValueError;

/// Status byte sent by the server in front of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    Success = 0,
    AccessDeny = 1,
    MaxReached = 2,
    LackMemory = 3,
    MisconfigPrefix = 4,
    MisconfigMode = 5,
    ConnectIncomplete = 6,
    PullError = 7,
    DispatchError = 8,
    PushError = 9,
}

impl ResponseCode {
    pub fn from_code(code: u8) -> Option<Self> {
        let rc = match code {
            0 => ResponseCode::Success,
            1 => ResponseCode::AccessDeny,
            2 => ResponseCode::MaxReached,
            3 => ResponseCode::LackMemory,
            4 => ResponseCode::MisconfigPrefix,
            5 => ResponseCode::MisconfigMode,
            6 => ResponseCode::ConnectIncomplete,
            7 => ResponseCode::PullError,
            8 => ResponseCode::DispatchError,
            9 => ResponseCode::PushError,
            _ => return None,
        };
        Some(rc)
    }

    pub fn description(self) -> &'static str {
        match self {
            ResponseCode::Success => "Success",
            ResponseCode::AccessDeny => "Access denied",
            ResponseCode::MaxReached => "Server reached maximum number of connections",
            ResponseCode::LackMemory => "Out of memory",
            ResponseCode::MisconfigPrefix => "Prefix not served",
            ResponseCode::MisconfigMode => "Prefix has type mismatch",
            ResponseCode::ConnectIncomplete => "No prior CONNECT RPC made",
            ResponseCode::PullError => "Invalid request/Server-side deserializing error",
            ResponseCode::DispatchError => "Dispatch error",
            ResponseCode::PushError => "Server-side serialize error",
        }
    }
}

/// Non-success status returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Server returned non-zero response code: {description} ({code})")]
pub struct ProtocolError {
    pub code: u8,
    pub description: &'static str,
}

impl ProtocolError {
    pub fn new(code: u8) -> Self {
        let description = ResponseCode::from_code(code).map_or("Unknown error", ResponseCode::description);
        Self { code, description }
    }

    pub fn response_code(&self) -> Option<ResponseCode> {
        ResponseCode::from_code(self.code)
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("could not resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("no usable address found for {0}")]
    NoAddress(String),

    #[error("could not connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("connection closed unexpectedly")]
    Closed,

    #[error("client is not connected")]
    NotConnected,

    #[error("transport io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ExmdbError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("invalid value: {0}")]
    Value(#[from] ValueError),
}

impl ExmdbError {
    /// Status code of a protocol error.
    pub fn code(&self) -> Option<u8> {
        match self {
            ExmdbError::Protocol(e) => Some(e.code),
            _ => None,
        }
    }
}
