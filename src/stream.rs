//! Buffered stream adapter over a connected transport.
//!
//! [`StreamBuffer`] owns one transport and two fixed 4 KiB buffers, and
//! exposes the connection through `std::io::{Read, BufRead, Write}`.
//!
//! - **underflow**: one receive call refills the read buffer; zero bytes is
//!   end of stream
//! - **overflow**: one send call drains the write buffer; `try_again` keeps
//!   the data, any other error fails the stream and closes the transport
//! - **sync**: a flush, i.e. overflow without a new byte

use std::io::{self, BufRead, Read, Write};
use std::time::Duration;

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result, SocketError};
use crate::net::options::ReceiveTimeout;
use crate::net::{self, Endpoint, Protocol, Resolver, ResolverFlags, Socket, Transport};

/// Size of each of the read and write buffers.
pub const BUFFER_SIZE: usize = 4096;

/// A plaintext socket stream.
pub type SocketStream = StreamBuffer<Socket>;

#[derive(Debug)]
pub struct StreamBuffer<T: Transport> {
    transport: T,
    read_buf: Box<[u8; BUFFER_SIZE]>,
    read_pos: usize,
    read_len: usize,
    write_buf: Box<[u8; BUFFER_SIZE]>,
    write_len: usize,
    unbuffered: bool,
    failed: bool,
    error: Option<Error>,
}

impl StreamBuffer<Socket> {
    /// A stream over a new closed plaintext socket.
    pub fn tcp(ctx: &Context) -> Self {
        Self::new(Socket::new(ctx))
    }
}

impl<T: Transport> StreamBuffer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            read_buf: Box::new([0; BUFFER_SIZE]),
            read_pos: 0,
            read_len: 0,
            write_buf: Box::new([0; BUFFER_SIZE]),
            write_len: 0,
            unbuffered: false,
            failed: false,
            error: None,
        }
    }

    /// The socket carrying the stream.
    pub fn socket(&self) -> &Socket {
        self.transport.socket()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The error recorded by the last failed I/O, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether a fatal error has ended the stream.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// With buffering off every write goes straight to one send call.
    pub fn set_unbuffered(&mut self, unbuffered: bool) {
        self.unbuffered = unbuffered;
    }

    /// Applies a receive timeout to every later blocking read.
    pub fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.socket().set_option(ReceiveTimeout(timeout))
    }

    /// Connects directly to `endpoint`, closing any current connection first.
    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.close_previous();
        let protocol = self
            .socket()
            .protocol()
            .map_or_else(|| Protocol::tcp(endpoint.family()), |p| p.with_family(endpoint.family()));
        let result = self
            .transport
            .open(protocol)
            .and_then(|()| self.transport.connect(endpoint));
        self.record(result)
    }

    /// Resolves `host`/`service` and connects to the first candidate that
    /// accepts, closing any current connection first.
    pub fn connect_host(&mut self, host: &str, service: &str) -> Result<Endpoint> {
        self.close_previous();
        let result = self.transport.set_peer_name(host).and_then(|()| {
            let endpoints = Resolver::tcp(self.transport.context()).resolve(host, service, ResolverFlags::NONE)?;
            net::connect(&mut self.transport, &endpoints)
        });
        self.record(result)
    }

    /// The old connection is gone either way; its close error does not stop
    /// the new one.
    fn close_previous(&mut self) {
        if let Err(e) = self.close() {
            debug!(error = %e, "closing previous connection");
        }
    }

    /// Flushes pending output and closes the transport.
    pub fn close(&mut self) -> Result<()> {
        if self.transport.is_open() && !self.failed && self.write_len > 0 {
            if let Err(e) = self.flush_all() {
                debug!(error = %e, "discarding unflushed output on close");
            }
        }
        self.read_pos = 0;
        self.read_len = 0;
        self.write_len = 0;
        self.failed = false;
        self.error = None;
        self.transport.close()
    }

    /// Refills the read buffer with one receive call if it is exhausted and
    /// returns the next byte without consuming it. `Ok(None)` is end of
    /// stream.
    pub fn underflow(&mut self) -> Result<Option<u8>> {
        if self.read_pos < self.read_len {
            return Ok(Some(self.read_buf[self.read_pos]));
        }
        if self.failed {
            return Ok(None);
        }
        match self.transport.receive_some(&mut self.read_buf[..]) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.read_pos = 0;
                self.read_len = n;
                Ok(Some(self.read_buf[0]))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Drains the write buffer with one send call, then queues `c`. When
    /// unbuffered, `c` alone is sent with one call.
    pub fn overflow(&mut self, c: Option<u8>) -> Result<()> {
        if self.failed {
            return Err(self.failed_error());
        }

        if self.unbuffered {
            return match c {
                Some(byte) => match self.transport.send_some(&[byte]) {
                    Ok(0) => Err(self.fail(SocketError::SendError.into())),
                    Ok(_) => Ok(()),
                    Err(e) => Err(self.fail(e)),
                },
                None => Ok(()),
            };
        }

        if self.write_len > 0 {
            match self.transport.send_some(&self.write_buf[..self.write_len]) {
                Ok(0) => return Err(self.fail(SocketError::SendError.into())),
                Ok(n) => {
                    self.write_buf.copy_within(n..self.write_len, 0);
                    self.write_len -= n;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        // a successful send always frees at least one byte
        if let Some(byte) = c {
            self.write_buf[self.write_len] = byte;
            self.write_len += 1;
        }
        Ok(())
    }

    /// Flushes the write buffer: `overflow` without a new byte.
    pub fn sync(&mut self) -> Result<()> {
        self.overflow(None)
    }

    /// Bytes queued for sending.
    pub fn pending_output(&self) -> usize {
        self.write_len
    }

    fn flush_all(&mut self) -> Result<()> {
        while self.write_len > 0 {
            self.sync()?;
        }
        Ok(())
    }

    fn record<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            self.error = Some(e.clone());
        }
        result
    }

    /// Records `e`; anything but `try_again` fails the stream and closes the
    /// transport.
    fn fail(&mut self, e: Error) -> Error {
        self.error = Some(e.clone());
        if !e.is_try_again() {
            warn!(error = %e, "stream failed, closing transport");
            self.failed = true;
            if let Err(close_err) = self.transport.close() {
                debug!(error = %close_err, "close after failure");
            }
        }
        e
    }

    fn failed_error(&self) -> Error {
        self.error
            .clone()
            .unwrap_or(Error::Socket(SocketError::NotConnected))
    }
}

impl<T: Transport> Read for StreamBuffer<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<T: Transport> BufRead for StreamBuffer<T> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.read_pos >= self.read_len {
            self.read_pos = 0;
            self.read_len = 0;
            self.underflow()?;
        }
        Ok(&self.read_buf[self.read_pos..self.read_len])
    }

    fn consume(&mut self, amt: usize) {
        self.read_pos = (self.read_pos + amt).min(self.read_len);
    }
}

impl<T: Transport> Write for StreamBuffer<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.failed {
            return Err(self.failed_error().into());
        }
        if self.unbuffered {
            return match self.transport.send_some(buf) {
                Ok(n) => Ok(n),
                Err(e) => Err(self.fail(e).into()),
            };
        }
        if self.write_len == BUFFER_SIZE {
            self.sync()?;
        }
        let n = (BUFFER_SIZE - self.write_len).min(buf.len());
        self.write_buf[self.write_len..self.write_len + n].copy_from_slice(&buf[..n]);
        self.write_len += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_all().map_err(io::Error::from)
    }
}

impl<T: Transport> Drop for StreamBuffer<T> {
    fn drop(&mut self) {
        if self.write_len > 0 && !self.failed && self.transport.is_open() {
            if let Err(e) = self.flush_all() {
                debug!(error = %e, "unflushed output dropped");
            }
        }
    }
}
