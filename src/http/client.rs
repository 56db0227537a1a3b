use std::fmt;
use std::io::{self, BufRead, Read, Write};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::context::Context;
use crate::error::{HttpError, Result, SocketError};
use crate::net::Transport;
use crate::stream::StreamBuffer;
use crate::tls::TlsStream;

use super::chunked::ChunkedDecoder;
use super::parser::ResponseParser;
use super::request::{default_port, HttpRequest};
use super::response::HttpResponse;
use super::writer::write_request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blocking HTTP/1.x client.
///
/// Every [`send`](HttpClient::send) opens a fresh connection and asks the
/// server to close it afterwards. The client's scheme decides the transport
/// and default port for requests whose URL does not name a scheme.
#[derive(Debug, Clone)]
pub struct HttpClient {
    ctx: Context,
    scheme: Scheme,
    user_agent: String,
    timeout: Option<Duration>,
    parser: ResponseParser,
}

impl HttpClient {
    pub fn http(ctx: &Context) -> Self {
        Self::with_scheme(ctx, Scheme::Http)
    }

    pub fn https(ctx: &Context) -> Self {
        Self::with_scheme(ctx, Scheme::Https)
    }

    fn with_scheme(ctx: &Context, scheme: Scheme) -> Self {
        let mut client = Self::from_config(ctx, &Config::default());
        client.scheme = scheme;
        client
    }

    pub fn from_config(ctx: &Context, config: &Config) -> Self {
        Self {
            ctx: ctx.clone(),
            scheme: if config.tls.enabled { Scheme::Https } else { Scheme::Http },
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            parser: ResponseParser::with_limit(config.max_header_bytes),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn set_user_agent(&mut self, agent: impl Into<String>) {
        self.user_agent = agent.into();
    }

    /// Used for requests that carry no timeout of their own.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Performs one request/response exchange on a fresh connection, which
    /// is closed before returning whether or not the exchange succeeded.
    ///
    /// With a `body` sink the response body is copied into it, framed by
    /// chunked coding, then `Content-Length`, then connection close. Without
    /// one only the head is read.
    pub fn send(&self, request: &mut HttpRequest, body: Option<&mut dyn Write>) -> Result<HttpResponse> {
        let (scheme, port) = self.prepare(request)?;
        match scheme {
            Scheme::Http => self.send_owned(StreamBuffer::tcp(&self.ctx), request, port, body),
            Scheme::Https => self.send_owned(TlsStream::tls(&self.ctx), request, port, body),
        }
    }

    /// Like [`send`](HttpClient::send) but on a caller-owned stream, which
    /// is connected to the request's host and left as the exchange ends.
    /// After a malformed response the connection is still open and the
    /// caller decides what to do with it. The request's scheme only picks
    /// the default port; the stream's transport is used as given.
    pub fn send_on<T: Transport>(
        &self,
        stream: &mut StreamBuffer<T>,
        request: &mut HttpRequest,
        body: Option<&mut dyn Write>,
    ) -> Result<HttpResponse> {
        let (_, port) = self.prepare(request)?;
        self.exchange(stream, request, port, body)
    }

    /// Runs [`send`](HttpClient::send) on the tokio blocking pool and
    /// collects the body in memory. Must be called from within a tokio
    /// runtime. The exchange cannot be cancelled once started; callers that
    /// need a deadline race the handle against their own timer.
    pub fn async_send(&self, mut request: HttpRequest) -> JoinHandle<Result<(HttpResponse, Bytes)>> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut body = BytesMut::new().writer();
            let response = client.send(&mut request, Some(&mut body as &mut dyn Write))?;
            Ok((response, body.into_inner().freeze()))
        })
    }

    /// Resolves the scheme and port for `request` and fills in the default
    /// headers.
    fn prepare(&self, request: &mut HttpRequest) -> Result<(Scheme, u16)> {
        let scheme = match request.scheme() {
            Some(name) => Scheme::from_name(name).ok_or(HttpError::MalformedRequest)?,
            None => self.scheme,
        };
        if request.host().is_empty() {
            return Err(HttpError::MalformedRequest.into());
        }
        let port = request
            .port()
            .or_else(|| request.scheme().and_then(default_port))
            .unwrap_or(self.scheme.default_port());

        let headers = request.headers_mut();
        headers.set_default("User-Agent", self.user_agent.as_str());
        headers.set_default("Accept", "*/*");
        headers.set_default("Connection", "close");
        Ok((scheme, port))
    }

    fn send_owned<T: Transport>(
        &self,
        mut stream: StreamBuffer<T>,
        request: &mut HttpRequest,
        port: u16,
        body: Option<&mut dyn Write>,
    ) -> Result<HttpResponse> {
        let result = self.exchange(&mut stream, request, port, body);
        if let Err(e) = stream.close() {
            debug!(error = %e, "closing connection");
        }
        result
    }

    fn exchange<T: Transport>(
        &self,
        stream: &mut StreamBuffer<T>,
        request: &mut HttpRequest,
        port: u16,
        body: Option<&mut dyn Write>,
    ) -> Result<HttpResponse> {
        let endpoint = stream.connect_host(request.host(), &port.to_string())?;
        debug!(%endpoint, host = request.host(), "connected");

        stream.set_receive_timeout(request.timeout().or(self.timeout))?;
        write_request(stream, request)?;
        stream.flush()?;

        let mut response = HttpResponse::default();
        self.parser.parse(stream, &mut response)?;

        let mut received = 0;
        if let Some(sink) = body {
            if response.has_body(request.method()) {
                received = read_body(stream, &response, sink)?;
            }
        }

        info!(
            method = %request.method(),
            host = request.host(),
            path = request.path(),
            status = response.status().as_u16(),
            body_bytes = received,
            "request complete"
        );
        Ok(response)
    }
}

/// Copies a response body from `reader` into `sink`: chunked coding first,
/// then exactly `Content-Length` bytes, otherwise everything up to end of
/// stream. Returns the decoded length.
pub fn read_body<R: BufRead + ?Sized>(reader: &mut R, response: &HttpResponse, sink: &mut dyn Write) -> Result<u64> {
    if response.is_chunked() {
        return ChunkedDecoder::new().decode(reader, sink);
    }
    if let Some(len) = response.content_length() {
        let copied = io::copy(&mut (&mut *reader).take(len), sink)?;
        if copied < len {
            return Err(SocketError::Eof.into());
        }
        return Ok(copied);
    }
    Ok(io::copy(reader, sink)?)
}
