use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::{debug, trace};

use super::Request;
use crate::{
    codec::{Buffer, Pop},
    error::{ConnectionError, ExmdbError, ProtocolError},
};

/// Opens byte streams to an exmdb server.
pub trait Connector {
    type Stream: Read + Write;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self::Stream, ConnectionError>;
}

/// Plain TCP connector. Tries every resolved address in turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<TcpStream, ConnectionError> {
        let address = format!("{host}:{port}");
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| ConnectionError::Resolve {
                address: address.clone(),
                source,
            })?;

        let mut last_error = None;
        for addr in addrs {
            debug!("Connecting to {addr}");
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(source) => last_error = Some(source),
            }
        }
        Err(match last_error {
            Some(source) => ConnectionError::Connect { address, source },
            None => ConnectionError::NoAddress(address),
        })
    }
}

/// Request/response exchange over a single stream.
pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    buffer: Buffer,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            buffer: Buffer::new(),
        }
    }

    pub fn write_request<R: Request>(&mut self, request: &R) -> Result<(), ExmdbError> {
        self.buffer.start();
        request.write(&mut self.buffer)?;
        self.buffer.finalize()?;
        trace!(
            "Sending {:?} request ({} bytes)",
            R::CALL_ID,
            self.buffer.len()
        );
        self.stream
            .write_all(self.buffer.as_bytes())
            .map_err(ConnectionError::from)?;
        self.stream.flush().map_err(ConnectionError::from)?;
        Ok(())
    }

    pub fn read_response<P: Pop>(&mut self) -> Result<P, ExmdbError> {
        self.fill(1)?;
        let status: u8 = self.buffer.pop()?;
        if status != 0 {
            return Err(ProtocolError::new(status).into());
        }

        self.fill(4)?;
        let len: u32 = self.buffer.pop()?;
        trace!("Receiving {len} byte response");
        self.fill(len as usize)?;
        Ok(self.buffer.pop()?)
    }

    /// Send a request and wait for its response.
    pub fn call<R: Request>(&mut self, request: &R) -> Result<R::Response, ExmdbError> {
        self.write_request(request)?;
        self.read_response()
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    /// Replace the buffer contents with exactly `len` bytes read from the stream.
    fn fill(&mut self, len: usize) -> Result<(), ConnectionError> {
        self.buffer
            .read_from(&mut self.stream, len)
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => ConnectionError::Closed,
                _ => ConnectionError::Io(e),
            })
    }
}


#[cfg(test)]
mod tests {
    use super::{mock::*, *};
    use crate::protocol::{
        request::{AllocateCn, GetFolderByName, UnloadTable},
        response::NullResponse,
    };

    #[test]
    fn read_write_request() {
        let mut transport = ProtocolTransport::new(MockStream::new(ok(&42u64.to_le_bytes())));

        let response = transport
            .call(&GetFolderByName {
                homedir: "/d",
                parent_id: 1,
                name: "x",
            })
            .unwrap();
        assert_eq!(response.folder_id, 42);

        let written = transport.into_inner().written();
        assert_eq!(&written[..4], &(written.len() as u32 - 4).to_le_bytes());
        assert_eq!(written[4], 0x13);
    }

    #[test]
    fn status_byte() {
        let mut transport = ProtocolTransport::new(MockStream::new(vec![8]));
        let err = transport.read_response::<NullResponse>().unwrap_err();
        assert_eq!(err.code(), Some(8));
    }

    #[test]
    fn short_read() {
        let mut data = ok(&7u64.to_le_bytes());
        data.truncate(data.len() - 2);
        let mut transport = ProtocolTransport::new(MockStream::new(data));

        let err = transport
            .call(&AllocateCn { homedir: "/d" })
            .unwrap_err();
        assert!(matches!(
            err,
            ExmdbError::Connection(ConnectionError::Closed)
        ));
    }

    #[test]
    fn oversized_length_prefix() {
        let mut data = vec![0];
        data.extend(u32::MAX.to_le_bytes());
        data.extend([1, 2, 3]);
        let mut transport = ProtocolTransport::new(MockStream::new(data));

        let err = transport.read_response::<NullResponse>().unwrap_err();
        assert!(matches!(
            err,
            ExmdbError::Connection(ConnectionError::Closed)
        ));
    }

    #[test]
    fn empty_payload() {
        let mut transport = ProtocolTransport::new(MockStream::new(ok(&[])));
        transport
            .call(&UnloadTable {
                homedir: "/d",
                table_id: 1,
            })
            .unwrap();
    }

    #[test]
    fn unresolvable_host() {
        let err = TcpConnector
            .connect("host.invalid", 5000, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Resolve { .. } | ConnectionError::NoAddress(_)
        ));
    }
}
