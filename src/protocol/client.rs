use std::time::Duration;

use log::{debug, info, warn};

use super::{
    Request,
    request::Connect,
    transport::{Connector, ProtocolTransport, TcpConnector},
};
use crate::error::{ConnectionError, ExmdbError, ResponseCode};

/// Client behavior flags.
pub mod flags {
    /// Re-establish the connection after a dispatch error.
    pub const AUTO_RECONNECT: u8 = 1 << 0;
}

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Store prefix served by the target server.
    pub prefix: String,
    pub is_private: bool,
    pub flags: u8,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            prefix: prefix.into(),
            is_private: true,
            flags: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        if enabled {
            self.flags |= flags::AUTO_RECONNECT;
        } else {
            self.flags &= !flags::AUTO_RECONNECT;
        }
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn auto_reconnect(&self) -> bool {
        self.flags & flags::AUTO_RECONNECT != 0
    }
}

/// Blocking exmdb client bound to one store prefix.
///
/// Every request is answered before the next one is sent. A connection error drops the
/// connection; later calls fail with [`ConnectionError::NotConnected`] until
/// [`ExmdbClient::reconnect`] succeeds.
pub struct ExmdbClient<C: Connector = TcpConnector> {
    connector: C,
    config: ClientConfig,
    transport: Option<ProtocolTransport<C::Stream>>,
}

impl ExmdbClient<TcpConnector> {
    /// Connect over TCP and perform the handshake.
    pub fn connect(config: ClientConfig) -> Result<Self, ExmdbError> {
        Self::with_connector(TcpConnector, config)
    }
}

impl<C: Connector> ExmdbClient<C> {
    pub fn with_connector(connector: C, config: ClientConfig) -> Result<Self, ExmdbError> {
        let mut client = Self {
            connector,
            config,
            transport: None,
        };
        client.reconnect()?;
        Ok(client)
    }

    /// Open a fresh connection. The current one is kept if this fails.
    pub fn reconnect(&mut self) -> Result<(), ExmdbError> {
        let transport = self.open()?;
        self.transport = Some(transport);
        Ok(())
    }

    fn open(&mut self) -> Result<ProtocolTransport<C::Stream>, ExmdbError> {
        let ClientConfig {
            host,
            port,
            prefix,
            is_private,
            connect_timeout,
            ..
        } = &self.config;
        debug!("Connecting to {host}:{port} for {prefix}");
        let stream = self.connector.connect(host, *port, *connect_timeout)?;
        let mut transport = ProtocolTransport::new(stream);
        transport.call(&Connect::new(prefix, *is_private))?;
        info!("Connected to {host}:{port} ({prefix})");
        Ok(transport)
    }

    /// Send a request and wait for its response.
    pub fn send<R: Request>(&mut self, request: &R) -> Result<R::Response, ExmdbError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(ConnectionError::NotConnected)?;
        debug!("Calling {:?}", R::CALL_ID);

        match transport.call(request) {
            Ok(response) => Ok(response),
            Err(err @ ExmdbError::Connection(_)) => {
                self.transport = None;
                Err(err)
            }
            Err(ExmdbError::Protocol(err))
                if err.response_code() == Some(ResponseCode::DispatchError)
                    && self.config.auto_reconnect() =>
            {
                warn!("{err}, reconnecting");
                if let Err(e) = self.reconnect() {
                    warn!("Reconnect failed: {e}");
                }
                Err(err.into())
            }
            Err(err) => Err(err),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!("Disconnected from {}:{}", self.config.host, self.config.port);
        }
    }
}
