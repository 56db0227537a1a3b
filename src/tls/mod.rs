//! TLS client layer.
//!
//! ```text
//!   TlsStream ──► TlsSocket ──► Socket ──► OS
//!                    │
//!                    └── TlsSession (rustls ClientConnection)
//! ```
//!
//! The session is created when the socket opens and reads its client
//! configuration from the context's TLS service. The handshake runs inside
//! `connect`; a failed handshake leaves the socket unusable and later sends
//! and receives report `not_connected`.

pub mod session;
pub mod socket;

pub use session::{SessionState, TlsSession};
pub use socket::TlsSocket;

use crate::context::Context;
use crate::stream::StreamBuffer;

/// A buffered stream over TLS.
pub type TlsStream = StreamBuffer<TlsSocket>;

impl StreamBuffer<TlsSocket> {
    /// A stream over a new closed TLS socket.
    pub fn tls(ctx: &Context) -> Self {
        Self::new(TlsSocket::new(ctx))
    }
}
