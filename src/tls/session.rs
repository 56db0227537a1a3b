use std::io::{self, Read, Write};
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::ClientConnection;
use tracing::{debug, trace};

use crate::error::{Error, Result, SocketError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Allocated, no handshake yet.
    Idle,
    Established,
    /// The handshake or a later record failed; the session cannot carry data.
    Failed,
    /// close_notify was sent.
    Closed,
}

/// One client TLS session. The session never owns the socket; every call
/// that moves records is handed the socket to use.
#[derive(Debug)]
pub struct TlsSession {
    config: Arc<rustls::ClientConfig>,
    conn: Option<ClientConnection>,
    state: SessionState,
}

impl TlsSession {
    pub fn new(config: Arc<rustls::ClientConfig>) -> Self {
        Self {
            config,
            conn: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }

    pub fn protocol_version(&self) -> Option<rustls::ProtocolVersion> {
        self.conn.as_ref().and_then(|c| c.protocol_version())
    }

    pub fn cipher_suite(&self) -> Option<rustls::SupportedCipherSuite> {
        self.conn.as_ref().and_then(|c| c.negotiated_cipher_suite())
    }

    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.conn.as_ref().and_then(|c| c.alpn_protocol())
    }

    /// Runs the client handshake to completion over `socket`.
    pub fn handshake(&mut self, socket: &socket2::Socket, server_name: ServerName<'static>) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(SocketError::AlreadyOpen.into());
        }
        let mut conn = match ClientConnection::new(self.config.clone(), server_name) {
            Ok(conn) => conn,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };

        let mut io = socket;
        while conn.is_handshaking() {
            if let Err(e) = conn.complete_io(&mut io) {
                self.state = SessionState::Failed;
                let err = Error::from(e);
                debug!(error = %err, "tls handshake failed");
                return Err(err);
            }
        }

        debug!(
            version = ?conn.protocol_version(),
            suite = ?conn.negotiated_cipher_suite().map(|s| s.suite()),
            "tls handshake complete"
        );
        self.conn = Some(conn);
        self.state = SessionState::Established;
        Ok(())
    }

    fn established(&mut self) -> Result<&mut ClientConnection> {
        match (self.state, self.conn.as_mut()) {
            (SessionState::Established, Some(conn)) => Ok(conn),
            _ => Err(SocketError::NotConnected.into()),
        }
    }

    /// Reads plaintext, pulling records from `socket` as needed. `Ok(0)` is
    /// end of stream. A socket that would block maps to `try_again`.
    pub fn read(&mut self, socket: &socket2::Socket, buf: &mut [u8]) -> Result<usize> {
        let conn = self.established()?;
        let mut io = socket;
        let result = loop {
            match conn.reader().read(buf) {
                Ok(n) => break Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("peer closed without close_notify");
                    break Ok(0);
                }
                Err(e) => break Err(Error::from(e)),
            }

            match conn.read_tls(&mut io) {
                Ok(n) => trace!(bytes = n, "tls records received"),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(Error::from(e)),
            }

            if let Err(e) = conn.process_new_packets() {
                // best effort: tell the peer why
                let _ = conn.write_tls(&mut io);
                break Err(Error::Tls(e));
            }
            if let Err(e) = flush_records(conn, &mut io) {
                break Err(e);
            }
        };

        if let Err(e) = &result {
            if !e.is_try_again() {
                self.state = SessionState::Failed;
            }
        }
        result
    }

    /// Encrypts `buf` and sends the records over `socket`.
    ///
    /// Plaintext accepted by the session is reported as written even when the
    /// socket would block; the queued records go out with the next call.
    pub fn write(&mut self, socket: &socket2::Socket, buf: &[u8]) -> Result<usize> {
        let conn = self.established()?;
        let mut io = socket;

        flush_records(conn, &mut io)?;
        let n = conn.writer().write(buf).map_err(Error::from)?;
        match flush_records(conn, &mut io) {
            Ok(()) => Ok(n),
            Err(e) if e.is_try_again() => Ok(n),
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Sends close_notify. Only an established session has anything to say.
    pub fn shutdown(&mut self, socket: &socket2::Socket) -> Result<()> {
        let Ok(conn) = self.established() else {
            return Ok(());
        };
        conn.send_close_notify();
        let mut io = socket;
        let result = flush_records(conn, &mut io);
        self.state = SessionState::Closed;
        result
    }
}

fn flush_records(conn: &mut ClientConnection, io: &mut &socket2::Socket) -> Result<()> {
    while conn.wants_write() {
        match conn.write_tls(io) {
            Ok(n) => trace!(bytes = n, "tls records sent"),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::from(e)),
        }
    }
    Ok(())
}
