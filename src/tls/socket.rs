use rustls::pki_types::ServerName;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result, SocketError, TransferError};
use crate::net::transport::transfer_all;
use crate::net::{Endpoint, Protocol, Socket, Transport};

use super::session::{SessionState, TlsSession};

/// A client socket whose traffic passes through a TLS session.
///
/// The session is allocated when the socket is opened (or assigned) and
/// bound to its handle; `connect` performs the handshake right after the
/// transport connects. Dropping the socket sends close_notify and closes the
/// handle, once.
#[derive(Debug)]
pub struct TlsSocket {
    socket: Socket,
    session: Option<TlsSession>,
    server_name: Option<String>,
}

impl TlsSocket {
    pub fn new(ctx: &Context) -> Self {
        Self {
            socket: Socket::new(ctx),
            session: None,
            server_name: None,
        }
    }

    pub fn open(&mut self, protocol: Protocol) -> Result<()> {
        self.socket.open(protocol)?;
        self.session = Some(TlsSession::new(self.socket.context().tls().client_config()));
        Ok(())
    }

    /// Adopts an existing OS socket; the handshake still has to run.
    pub fn assign(&mut self, protocol: Protocol, handle: socket2::Socket) -> Result<()> {
        self.socket.assign(protocol, handle)?;
        self.session = Some(TlsSession::new(self.socket.context().tls().client_config()));
        Ok(())
    }

    /// Name presented for SNI and checked against the certificate. Without
    /// one, `connect` uses the endpoint's IP address.
    pub fn set_server_name(&mut self, host: impl Into<String>) {
        self.server_name = Some(host.into());
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn session(&self) -> Option<&TlsSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_open()
    }

    /// Whether the handshake completed and the session can carry data.
    pub fn is_usable(&self) -> bool {
        self.session.as_ref().is_some_and(TlsSession::is_established)
    }

    /// Connects the transport, then runs the TLS handshake.
    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.socket.connect(endpoint)?;
        let name = self.resolve_server_name(endpoint)?;
        let handle = self.socket.handle()?;
        let session = self.session.as_mut().ok_or(Error::Socket(SocketError::NotOpen))?;
        session.handshake(handle, name)
    }

    fn resolve_server_name(&self, endpoint: &Endpoint) -> Result<ServerName<'static>> {
        match &self.server_name {
            Some(host) => ServerName::try_from(host.clone())
                .map_err(|e| Error::Tls(rustls::Error::General(format!("invalid server name {host:?}: {e}")))),
            None => Ok(ServerName::IpAddress(std::net::IpAddr::from(endpoint.address()).into())),
        }
    }

    /// Sends close_notify, then closes the transport. A shutdown failure is
    /// reported after the transport has been closed.
    pub fn close(&mut self) -> Result<()> {
        let shutdown = match (self.session.as_mut(), self.socket.handle()) {
            (Some(session), Ok(handle)) => session.shutdown(handle),
            _ => Ok(()),
        };
        if let Err(e) = &shutdown {
            warn!(error = %e, "tls shutdown failed");
        }
        self.session = None;
        let closed = self.socket.close();
        shutdown.and(closed)
    }

    /// One TLS read; `Ok(0)` is end of stream.
    pub fn receive_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        let handle = self.socket.handle()?;
        let session = self.session.as_mut().ok_or(Error::Socket(SocketError::NotConnected))?;
        session.read(handle, buf)
    }

    /// One TLS write.
    pub fn send_some(&mut self, buf: &[u8]) -> Result<usize> {
        let handle = self.socket.handle()?;
        let session = self.session.as_mut().ok_or(Error::Socket(SocketError::NotConnected))?;
        session.write(handle, buf)
    }

    pub fn send(&mut self, buf: &[u8]) -> std::result::Result<usize, TransferError> {
        transfer_all(buf.len(), SocketError::SendError, |done| self.send_some(&buf[done..]))
    }

    pub fn receive(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TransferError> {
        let len = buf.len();
        transfer_all(len, SocketError::Eof, |done| self.receive_some(&mut buf[done..]))
    }
}

impl Transport for TlsSocket {
    fn context(&self) -> &Context {
        self.socket.context()
    }

    fn socket(&self) -> &Socket {
        &self.socket
    }

    fn open(&mut self, protocol: Protocol) -> Result<()> {
        TlsSocket::open(self, protocol)
    }

    fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        TlsSocket::connect(self, endpoint)
    }

    fn close(&mut self) -> Result<()> {
        TlsSocket::close(self)
    }

    fn send_some(&mut self, buf: &[u8]) -> Result<usize> {
        TlsSocket::send_some(self, buf)
    }

    fn receive_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        TlsSocket::receive_some(self, buf)
    }

    fn set_peer_name(&mut self, host: &str) -> Result<()> {
        self.set_server_name(host);
        Ok(())
    }
}

impl Drop for TlsSocket {
    fn drop(&mut self) {
        if self.session.as_ref().is_some_and(|s| s.state() == SessionState::Established) {
            if let Err(e) = self.close() {
                debug!(error = %e, "tls close on drop");
            }
        }
    }
}
