use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::net::Shutdown;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use tracing::{debug, trace};

use crate::context::Context;
use crate::error::{Error, Result, SocketError, TransferError};

use super::endpoint::Endpoint;
use super::options::SocketOption;
use super::platform::Protocol;
use super::transport::{transfer_all, Transport};

/// How long a single [`Socket::wait`] call polls before giving up.
pub const WAIT_TIMEOUT: Duration = Duration::from_millis(200);

/// Lifecycle state of a [`Socket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Closed,
    Open,
    Bound,
    Connected,
}

/// Readiness condition for [`Socket::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Read,
    Write,
    Error,
}

/// A blocking socket owning at most one OS handle.
///
/// Dropping the socket closes the handle. [`Socket::take`] moves the handle
/// into a new value and leaves this one closed.
#[derive(Debug)]
pub struct Socket {
    ctx: Context,
    handle: Option<socket2::Socket>,
    protocol: Option<Protocol>,
    state: SocketState,
}

impl Socket {
    /// A closed socket bound to the services of `ctx`.
    pub fn new(ctx: &Context) -> Self {
        Self {
            ctx: ctx.clone(),
            handle: None,
            protocol: None,
            state: SocketState::Closed,
        }
    }

    pub(crate) fn from_handle(ctx: &Context, protocol: Protocol, handle: socket2::Socket, state: SocketState) -> Self {
        Self {
            ctx: ctx.clone(),
            handle: Some(handle),
            protocol: Some(protocol),
            state,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn open(&mut self, protocol: Protocol) -> Result<()> {
        if self.handle.is_some() {
            return Err(SocketError::AlreadyOpen.into());
        }
        let handle = protocol.create().map_err(Error::Os)?;
        trace!(%protocol, fd = handle.as_raw_fd(), "socket opened");
        self.handle = Some(handle);
        self.protocol = Some(protocol);
        self.state = SocketState::Open;
        Ok(())
    }

    /// Adopts an existing OS socket.
    pub fn assign(&mut self, protocol: Protocol, handle: socket2::Socket) -> Result<()> {
        if self.handle.is_some() {
            return Err(SocketError::AlreadyOpen.into());
        }
        self.state = if handle.peer_addr().is_ok() { SocketState::Connected } else { SocketState::Open };
        self.handle = Some(handle);
        self.protocol = Some(protocol);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    /// The protocol the socket was last opened with, kept across `close`.
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    pub fn native_handle(&self) -> Option<RawFd> {
        self.handle.as_ref().map(|h| h.as_raw_fd())
    }

    pub(crate) fn handle(&self) -> Result<&socket2::Socket> {
        self.handle.as_ref().ok_or(Error::Socket(SocketError::NotOpen))
    }

    pub fn bind(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.handle()?.bind(&endpoint.to_sock_addr()).map_err(Error::Os)?;
        self.state = SocketState::Bound;
        Ok(())
    }

    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        let handle = self.handle()?;
        match handle.connect(&endpoint.to_sock_addr()) {
            Ok(()) => {}
            // the handshake carries on after a signal; reissuing connect
            // would only report EALREADY
            Err(e) if e.kind() == io::ErrorKind::Interrupted => finish_connect(handle).map_err(Error::Os)?,
            Err(e) => return Err(Error::Os(e)),
        }
        debug!(%endpoint, "socket connected");
        self.state = SocketState::Connected;
        Ok(())
    }

    pub(crate) fn listen(&mut self, backlog: i32) -> Result<()> {
        self.handle()?.listen(backlog).map_err(Error::Os)
    }

    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        self.handle()?.shutdown(how).map_err(Error::Os)
    }

    /// Closes the handle. Closing a closed socket succeeds.
    pub fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            trace!(fd = handle.as_raw_fd(), "socket closed");
        }
        self.state = SocketState::Closed;
        Ok(())
    }

    /// Gives up ownership of the OS handle without closing it.
    pub fn release(&mut self) -> Option<socket2::Socket> {
        self.state = SocketState::Closed;
        self.handle.take()
    }

    /// Moves the handle into a new socket, leaving this one closed.
    pub fn take(&mut self) -> Socket {
        let state = std::mem::replace(&mut self.state, SocketState::Closed);
        Socket {
            ctx: self.ctx.clone(),
            handle: self.handle.take(),
            protocol: self.protocol,
            state,
        }
    }

    pub fn local_endpoint(&self) -> Result<Endpoint> {
        let addr = self.handle()?.local_addr().map_err(Error::Os)?;
        Endpoint::from_sock_addr(&addr).ok_or_else(unsupported_family)
    }

    pub fn remote_endpoint(&self) -> Result<Endpoint> {
        let addr = self.handle()?.peer_addr().map_err(Error::Os)?;
        Endpoint::from_sock_addr(&addr).ok_or_else(unsupported_family)
    }

    pub fn set_option<O: SocketOption>(&self, option: O) -> Result<()> {
        option.apply(self.handle()?).map_err(Error::Os)
    }

    pub fn get_option<O: SocketOption>(&self) -> Result<O> {
        O::query(self.handle()?).map_err(Error::Os)
    }

    pub fn set_non_blocking(&self, non_blocking: bool) -> Result<()> {
        self.handle()?.set_nonblocking(non_blocking).map_err(Error::Os)
    }

    /// One OS send call.
    pub fn send_some(&self, buf: &[u8]) -> Result<usize> {
        let mut handle = self.handle()?;
        loop {
            match handle.write(buf) {
                Ok(n) => {
                    trace!(bytes = n, "sent");
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// One OS receive call; `Ok(0)` is end of stream.
    pub fn receive_some(&self, buf: &mut [u8]) -> Result<usize> {
        let mut handle = self.handle()?;
        loop {
            match handle.read(buf) {
                Ok(n) => {
                    trace!(bytes = n, "received");
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Sends all of `buf`, stopping at the first error. `try_again` is not
    /// retried; the error carries the count sent so far.
    pub fn send(&self, buf: &[u8]) -> std::result::Result<usize, TransferError> {
        transfer_all(buf.len(), SocketError::SendError, |done| self.send_some(&buf[done..]))
    }

    /// Fills all of `buf`, stopping at the first error or end of stream.
    pub fn receive(&self, buf: &mut [u8]) -> std::result::Result<usize, TransferError> {
        let len = buf.len();
        transfer_all(len, SocketError::Eof, |done| self.receive_some(&mut buf[done..]))
    }

    /// Sends one datagram to `endpoint`.
    pub fn send_to(&self, buf: &[u8], endpoint: &Endpoint) -> Result<usize> {
        self.handle()?.send_to(buf, &endpoint.to_sock_addr()).map_err(Error::from)
    }

    /// Receives one datagram and the endpoint it came from.
    pub fn receive_from(&self, buf: &mut [u8]) -> Result<(usize, Endpoint)> {
        // SAFETY: initialized bytes are valid MaybeUninit<u8>, and recv_from
        // only writes initialized bytes into the slice.
        let uninit = unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };
        let (n, addr) = self.handle()?.recv_from(uninit).map_err(Error::from)?;
        let endpoint = Endpoint::from_sock_addr(&addr).ok_or_else(unsupported_family)?;
        Ok((n, endpoint))
    }

    /// Polls for one readiness condition for at most [`WAIT_TIMEOUT`].
    /// Returns `try_again` when the condition did not occur in time; callers
    /// wanting a longer wait call it again.
    pub fn wait(&self, kind: WaitKind) -> Result<()> {
        let events = match kind {
            WaitKind::Read => libc::POLLIN,
            WaitKind::Write => libc::POLLOUT,
            WaitKind::Error => libc::POLLPRI | libc::POLLERR | libc::POLLHUP,
        };
        let mut fd = libc::pollfd {
            fd: self.handle()?.as_raw_fd(),
            events,
            revents: 0,
        };
        // SAFETY: `fd` is a single valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut fd, 1, WAIT_TIMEOUT.as_millis() as libc::c_int) };
        match rc {
            0 => Err(SocketError::TryAgain.into()),
            n if n > 0 => Ok(()),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    Err(SocketError::TryAgain.into())
                } else {
                    Err(Error::Os(err))
                }
            }
        }
    }
}

/// Waits for an in-progress connect to settle and reports its outcome.
fn finish_connect(handle: &socket2::Socket) -> io::Result<()> {
    let mut fd = libc::pollfd {
        fd: handle.as_raw_fd(),
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        // SAFETY: `fd` is a single valid pollfd for the duration of the call.
        if unsafe { libc::poll(&mut fd, 1, -1) } >= 0 {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
    match handle.take_error()? {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn unsupported_family() -> Error {
    Error::Os(io::Error::from_raw_os_error(libc::EAFNOSUPPORT))
}

impl Transport for Socket {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn socket(&self) -> &Socket {
        self
    }

    fn open(&mut self, protocol: Protocol) -> Result<()> {
        Socket::open(self, protocol)
    }

    fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        Socket::connect(self, endpoint)
    }

    fn close(&mut self) -> Result<()> {
        Socket::close(self)
    }

    fn send_some(&mut self, buf: &[u8]) -> Result<usize> {
        Socket::send_some(self, buf)
    }

    fn receive_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        Socket::receive_some(self, buf)
    }
}
