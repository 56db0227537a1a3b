use crate::context::Context;
use crate::error::{Error, Result, SocketError, TransferError};

use super::endpoint::Endpoint;
use super::platform::Protocol;
use super::socket::Socket;

/// A connection-oriented byte transport: the plain [`Socket`] or a TLS
/// socket layered over one.
///
/// The stream adapter and the multi-endpoint [`connect`](super::connect)
/// helper are written against this trait, so both work unchanged over TLS.
pub trait Transport {
    fn context(&self) -> &Context;

    /// The plain socket carrying the bytes.
    fn socket(&self) -> &Socket;

    fn is_open(&self) -> bool {
        self.socket().is_open()
    }

    fn open(&mut self, protocol: Protocol) -> Result<()>;

    fn connect(&mut self, endpoint: &Endpoint) -> Result<()>;

    /// Closing an already closed transport succeeds.
    fn close(&mut self) -> Result<()>;

    /// One send primitive call.
    fn send_some(&mut self, buf: &[u8]) -> Result<usize>;

    /// One receive primitive call; `Ok(0)` is end of stream.
    fn receive_some(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Name of the peer being connected to, for transports that verify it.
    fn set_peer_name(&mut self, _host: &str) -> Result<()> {
        Ok(())
    }

    /// Sends the whole buffer, stopping early at the first error.
    fn send(&mut self, buf: &[u8]) -> std::result::Result<usize, TransferError> {
        transfer_all(buf.len(), SocketError::SendError, |done| self.send_some(&buf[done..]))
    }

    /// Fills the whole buffer, stopping early at the first error or at end of
    /// stream.
    fn receive(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TransferError> {
        let len = buf.len();
        transfer_all(len, SocketError::Eof, |done| self.receive_some(&mut buf[done..]))
    }
}

/// Repeats `op` until `len` bytes have moved. `op` receives the count moved
/// so far. A zero-length step ends the loop with `on_zero`; any error ends it
/// as-is, including `try_again`.
pub(crate) fn transfer_all<F>(
    len: usize,
    on_zero: SocketError,
    mut op: F,
) -> std::result::Result<usize, TransferError>
where
    F: FnMut(usize) -> Result<usize>,
{
    let mut done = 0;
    while done < len {
        match op(done) {
            Ok(0) => {
                return Err(TransferError {
                    transferred: done,
                    error: Error::Socket(on_zero),
                });
            }
            Ok(n) => done += n,
            Err(error) => return Err(TransferError { transferred: done, error }),
        }
    }
    Ok(done)
}
