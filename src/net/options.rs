//! BSD-style socket options.
//!
//! Each option is a small value type implementing [`SocketOption`]; pass it
//! to [`Socket::set_option`](super::Socket::set_option) or read it back with
//! [`Socket::get_option`](super::Socket::get_option).

use std::io;
use std::os::fd::AsRawFd;
use std::time::Duration;

/// An option that can be applied to and queried from an OS socket.
pub trait SocketOption: Sized {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()>;
    fn query(socket: &socket2::Socket) -> io::Result<Self>;
}

macro_rules! bool_option {
    ($(#[$doc:meta])* $name:ident, $set:ident, $get:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub bool);

        impl SocketOption for $name {
            fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
                socket.$set(self.0)
            }

            fn query(socket: &socket2::Socket) -> io::Result<Self> {
                socket.$get().map($name)
            }
        }
    };
}

bool_option!(
    /// `SO_REUSEADDR`
    ReuseAddress, set_reuse_address, reuse_address
);
bool_option!(
    /// `SO_KEEPALIVE`
    KeepAlive, set_keepalive, keepalive
);
bool_option!(
    /// `SO_BROADCAST`
    Broadcast, set_broadcast, broadcast
);
bool_option!(
    /// `SO_OOBINLINE`
    OutOfBandInline, set_out_of_band_inline, out_of_band_inline
);
bool_option!(
    /// `TCP_NODELAY`
    NoDelay, set_nodelay, nodelay
);

/// `SO_LINGER`: `Some(duration)` enables lingering on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linger(pub Option<Duration>);

impl SocketOption for Linger {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
        socket.set_linger(self.0)
    }

    fn query(socket: &socket2::Socket) -> io::Result<Self> {
        socket.linger().map(Linger)
    }
}

/// `SO_RCVBUF`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveBufferSize(pub usize);

impl SocketOption for ReceiveBufferSize {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
        socket.set_recv_buffer_size(self.0)
    }

    fn query(socket: &socket2::Socket) -> io::Result<Self> {
        socket.recv_buffer_size().map(ReceiveBufferSize)
    }
}

/// `SO_SNDBUF`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendBufferSize(pub usize);

impl SocketOption for SendBufferSize {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
        socket.set_send_buffer_size(self.0)
    }

    fn query(socket: &socket2::Socket) -> io::Result<Self> {
        socket.send_buffer_size().map(SendBufferSize)
    }
}

/// `SO_RCVTIMEO`: blocking receives give up with `try_again` after this long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveTimeout(pub Option<Duration>);

impl SocketOption for ReceiveTimeout {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
        socket.set_read_timeout(self.0)
    }

    fn query(socket: &socket2::Socket) -> io::Result<Self> {
        socket.read_timeout().map(ReceiveTimeout)
    }
}

/// `SO_SNDTIMEO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTimeout(pub Option<Duration>);

impl SocketOption for SendTimeout {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
        socket.set_write_timeout(self.0)
    }

    fn query(socket: &socket2::Socket) -> io::Result<Self> {
        socket.write_timeout().map(SendTimeout)
    }
}

fn set_int(socket: &socket2::Socket, name: libc::c_int, value: libc::c_int) -> io::Result<()> {
    // SAFETY: `value` is a live c_int and its size is passed alongside it.
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            name,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
}

fn get_int(socket: &socket2::Socket, name: libc::c_int) -> io::Result<libc::c_int> {
    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: `value` and `len` are valid for writes of their declared sizes.
    let rc = unsafe {
        libc::getsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            name,
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if rc == 0 { Ok(value) } else { Err(io::Error::last_os_error()) }
}

/// `SO_DEBUG`. Setting it usually needs elevated privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketDebug(pub bool);

impl SocketOption for SocketDebug {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
        set_int(socket, libc::SO_DEBUG, self.0 as libc::c_int)
    }

    fn query(socket: &socket2::Socket) -> io::Result<Self> {
        get_int(socket, libc::SO_DEBUG).map(|v| SocketDebug(v != 0))
    }
}

/// `SO_DONTROUTE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DontRoute(pub bool);

impl SocketOption for DontRoute {
    fn apply(&self, socket: &socket2::Socket) -> io::Result<()> {
        set_int(socket, libc::SO_DONTROUTE, self.0 as libc::c_int)
    }

    fn query(socket: &socket2::Socket) -> io::Result<Self> {
        get_int(socket, libc::SO_DONTROUTE).map(|v| DontRoute(v != 0))
    }
}
