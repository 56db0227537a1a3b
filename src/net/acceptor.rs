use std::io;

use tracing::{debug, info};

use crate::context::Context;
use crate::error::{Error, Result, SocketError};

use super::endpoint::Endpoint;
use super::options::{ReuseAddress, SocketOption};
use super::platform::Protocol;
use super::socket::{Socket, SocketState};

/// Backlog used by [`Acceptor::bind_to`].
pub const DEFAULT_BACKLOG: i32 = 128;

/// A listening socket producing connected [`Socket`]s.
#[derive(Debug)]
pub struct Acceptor {
    socket: Socket,
    enable_connection_aborted: bool,
}

impl Acceptor {
    pub fn new(ctx: &Context) -> Self {
        Self {
            socket: Socket::new(ctx),
            enable_connection_aborted: false,
        }
    }

    /// Opens, binds and listens on `endpoint` in one step.
    pub fn bind_to(ctx: &Context, endpoint: &Endpoint, reuse_address: bool) -> Result<Self> {
        let mut acceptor = Self::new(ctx);
        acceptor.open(Protocol::tcp(endpoint.family()))?;
        if reuse_address {
            acceptor.set_option(ReuseAddress(true))?;
        }
        acceptor.bind(endpoint)?;
        acceptor.listen(DEFAULT_BACKLOG)?;
        info!(endpoint = %acceptor.local_endpoint()?, "listening");
        Ok(acceptor)
    }

    pub fn open(&mut self, protocol: Protocol) -> Result<()> {
        self.socket.open(protocol)
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_open()
    }

    pub fn bind(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.socket.bind(endpoint)
    }

    pub fn listen(&mut self, backlog: i32) -> Result<()> {
        self.socket.listen(backlog)
    }

    pub fn close(&mut self) -> Result<()> {
        self.socket.close()
    }

    pub fn local_endpoint(&self) -> Result<Endpoint> {
        self.socket.local_endpoint()
    }

    pub fn set_option<O: SocketOption>(&self, option: O) -> Result<()> {
        self.socket.set_option(option)
    }

    pub fn get_option<O: SocketOption>(&self) -> Result<O> {
        self.socket.get_option()
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Whether `accept` keeps waiting after an aborted connection.
    pub fn enable_connection_aborted(&self) -> bool {
        self.enable_connection_aborted
    }

    pub fn set_enable_connection_aborted(&mut self, enable: bool) {
        self.enable_connection_aborted = enable;
    }

    /// Waits for a connection and returns it with the peer's endpoint.
    ///
    /// An aborted connection (`ECONNABORTED`) is reported to the caller
    /// unless [`enable_connection_aborted`](Self::enable_connection_aborted)
    /// is set, in which case accepting continues.
    pub fn accept(&self) -> Result<(Socket, Endpoint)> {
        let handle = self.socket.handle()?;
        let protocol = self
            .socket
            .protocol()
            .ok_or(Error::Socket(SocketError::NotOpen))?;
        let (conn, addr) = accept_loop(self.enable_connection_aborted, || handle.accept())?;
        let peer = Endpoint::from_sock_addr(&addr)
            .ok_or_else(|| Error::Os(io::Error::from_raw_os_error(libc::EAFNOSUPPORT)))?;
        debug!(%peer, "accepted connection");
        let protocol = protocol.with_family(peer.family());
        Ok((Socket::from_handle(self.socket.context(), protocol, conn, SocketState::Connected), peer))
    }

    /// Accepts into an existing closed socket.
    pub fn accept_into(&self, peer: &mut Socket) -> Result<Endpoint> {
        if peer.is_open() {
            return Err(SocketError::AlreadyOpen.into());
        }
        let (socket, endpoint) = self.accept()?;
        *peer = socket;
        Ok(endpoint)
    }
}

fn accept_loop<T>(enable_connection_aborted: bool, mut op: impl FnMut() -> io::Result<T>) -> Result<T> {
    loop {
        match op() {
            Ok(accepted) => return Ok(accepted),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.raw_os_error() == Some(libc::ECONNABORTED) && enable_connection_aborted => {
                debug!("connection aborted before accept, waiting for the next one");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aborted() -> io::Error {
        io::Error::from_raw_os_error(libc::ECONNABORTED)
    }

    #[test]
    fn aborted_connection_is_reported_by_default() {
        let mut calls = 0;
        let result: Result<u32> = accept_loop(false, || {
            calls += 1;
            Err(aborted())
        });
        assert_eq!(result.unwrap_err().raw_os_error(), Some(libc::ECONNABORTED));
        assert_eq!(calls, 1);
    }

    #[test]
    fn aborted_connection_is_retried_when_enabled() {
        let mut calls = 0;
        let result = accept_loop(true, || {
            calls += 1;
            if calls < 3 { Err(aborted()) } else { Ok(7) }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 3);
    }

    #[test]
    fn other_errors_stop_the_retry() {
        let mut calls = 0;
        let result: Result<u32> = accept_loop(true, || {
            calls += 1;
            if calls == 1 { Err(aborted()) } else { Err(io::Error::from_raw_os_error(libc::EMFILE)) }
        });
        assert_eq!(result.unwrap_err().raw_os_error(), Some(libc::EMFILE));
        assert_eq!(calls, 2);
    }
}
