use std::io::{self, Write};

use tracing::trace;

use crate::error::Result;

use super::request::HttpRequest;

/// Serializes the request line and headers, including the blank line that
/// ends the head.
pub fn serialize_head(request: &HttpRequest) -> Vec<u8> {
    let mut buf = Vec::new();

    let request_line = format!(
        "{} {} {}\r\n",
        request.method(),
        request.resource(),
        request.version()
    );
    buf.extend_from_slice(request_line.as_bytes());

    for (name, value) in request.headers() {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

/// Writes the head, then copies the request body verbatim. The body is
/// consumed. Returns the number of bytes written.
pub fn write_request<W: Write + ?Sized>(out: &mut W, request: &mut HttpRequest) -> Result<u64> {
    let head = serialize_head(request);
    out.write_all(&head)?;
    let mut written = head.len() as u64;

    if let Some(mut body) = request.take_body() {
        written += io::copy(&mut body, out)?;
    }

    trace!(bytes = written, "request written");
    Ok(written)
}
