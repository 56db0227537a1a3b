//! Error types shared by every layer of the stack.
//!
//! Errors are grouped into domains: socket, resolver, http, raw OS failures
//! and TLS failures. Every fallible operation returns [`Result`], so callers
//! that want fail-fast behaviour simply propagate with `?`, while callers that
//! need to tell a retryable condition apart use [`Error::is_try_again`].

use std::io;

/// Socket-level error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// `open` was called on a socket that already owns a handle.
    #[error("socket already open")]
    AlreadyOpen,
    /// No candidate endpoint could be connected.
    #[error("no endpoint could be connected")]
    NotFound,
    /// A send failed without the OS reporting a more specific reason.
    #[error("send failed")]
    SendError,
    /// A receive failed without the OS reporting a more specific reason.
    #[error("receive failed")]
    ReceiveError,
    /// The peer closed the connection.
    #[error("end of stream")]
    Eof,
    /// The operation would block; the caller may retry it.
    #[error("operation should be retried")]
    TryAgain,
    /// The operation needs an open socket.
    #[error("socket not open")]
    NotOpen,
    /// The socket is open but has no usable connection.
    #[error("socket not connected")]
    NotConnected,
}

/// Name resolution error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    #[error("host not found")]
    HostNotFound,
    /// Temporary resolver failure; the lookup may succeed later.
    #[error("temporary failure in name resolution")]
    TryAgain,
    #[error("service not found")]
    ServiceNotFound,
}

/// HTTP protocol error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("malformed response")]
    MalformedResponse,
    #[error("malformed request")]
    MalformedRequest,
}

/// Errors produced by the networking stack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("http error: {0}")]
    Http(#[from] HttpError),

    /// Raw OS failure, carrying the platform error value when there is one.
    #[error("os error: {0}")]
    Os(io::Error),

    /// Failure reported by the TLS library.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the failed operation may simply be retried.
    pub fn is_try_again(&self) -> bool {
        matches!(
            self,
            Error::Socket(SocketError::TryAgain) | Error::Resolver(ResolverError::TryAgain)
        )
    }

    /// Whether this is the end-of-stream condition.
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Socket(SocketError::Eof))
    }

    /// The platform error value, for OS failures.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Os(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// The socket-domain condition, if this error belongs to that domain.
    pub fn socket_error(&self) -> Option<SocketError> {
        match self {
            Error::Socket(e) => Some(*e),
            _ => None,
        }
    }

    /// Wraps the calling thread's last OS error.
    pub fn last_os_error() -> Self {
        Error::Os(io::Error::last_os_error())
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Socket(e) => Error::Socket(*e),
            Error::Resolver(e) => Error::Resolver(*e),
            Error::Http(e) => Error::Http(*e),
            Error::Os(e) => Error::Os(match e.raw_os_error() {
                Some(code) => io::Error::from_raw_os_error(code),
                None => io::Error::new(e.kind(), e.to_string()),
            }),
            Error::Tls(e) => Error::Tls(e.clone()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                Error::Socket(SocketError::TryAgain)
            }
            io::ErrorKind::UnexpectedEof => Error::Socket(SocketError::Eof),
            _ => {
                // errors that took a trip through a std::io trait impl
                if let Some(ours) = e.get_ref().and_then(|inner| inner.downcast_ref::<Error>()) {
                    return ours.clone();
                }
                // rustls reports its own failures through io::Error
                if let Some(tls) = e.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
                    return Error::Tls(tls.clone());
                }
                Error::Os(e)
            }
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Os(e) => e,
            Error::Socket(SocketError::TryAgain) => io::Error::from(io::ErrorKind::WouldBlock),
            Error::Socket(SocketError::Eof) => io::Error::from(io::ErrorKind::UnexpectedEof),
            Error::Socket(SocketError::NotConnected) => io::Error::from(io::ErrorKind::NotConnected),
            Error::Http(_) => io::Error::new(io::ErrorKind::InvalidData, e),
            other => io::Error::other(other),
        }
    }
}

/// A partial-transfer loop stopped before moving the whole buffer.
#[derive(Debug, thiserror::Error)]
#[error("{error} after {transferred} bytes")]
pub struct TransferError {
    /// Bytes moved before the loop stopped.
    pub transferred: usize,
    #[source]
    pub error: Error,
}

impl TransferError {
    pub fn is_try_again(&self) -> bool {
        self.error.is_try_again()
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        e.error
    }
}
