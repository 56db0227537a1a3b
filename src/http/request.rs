use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

use bytes::{Buf, Bytes};

use crate::error::{HttpError, Result};

use super::headers::Headers;
use super::version::Version;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
    PATCH,
    CONNECT,
    TRACE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = HttpError;

    /// Method names are case-sensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "OPTIONS" => Ok(Method::OPTIONS),
            "PATCH" => Ok(Method::PATCH),
            "CONNECT" => Ok(Method::CONNECT),
            "TRACE" => Ok(Method::TRACE),
            _ => Err(HttpError::MalformedRequest),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known port for `scheme`.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// An outgoing HTTP request.
///
/// The target is kept in parts (scheme, host, port, path, query) so the
/// client can resolve it; the `Host` header is derived from host and port
/// and follows every change to either.
pub struct HttpRequest {
    method: Method,
    scheme: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    version: Version,
    headers: Headers,
    timeout: Option<Duration>,
    body: Option<Box<dyn Read + Send>>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("body", &self.body.is_some())
            .finish()
    }
}

impl HttpRequest {
    /// A request for `path` on `host` with no scheme or port of its own.
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        let mut request = Self {
            method,
            scheme: None,
            host: host.into(),
            port: None,
            path: normalize_path(path.into()),
            query: None,
            version: Version::Http11,
            headers: Headers::new(),
            timeout: None,
            body: None,
        };
        request.update_host_header();
        request
    }

    /// Builds a request from an absolute URL. The URL's query is kept as
    /// written and goes out unchanged on the request line.
    pub fn from_url(method: Method, url: &str) -> Result<Self> {
        let url = url::Url::parse(url).map_err(|_| HttpError::MalformedRequest)?;
        let host = match url.host() {
            Some(url::Host::Domain(d)) => d.to_string(),
            Some(url::Host::Ipv4(ip)) => ip.to_string(),
            Some(url::Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(HttpError::MalformedRequest.into()),
        };

        let mut request = Self::new(method, host, url.path());
        request.scheme = Some(url.scheme().to_string());
        request.port = url.port();
        request.query = url.query().map(str::to_string);
        request.update_host_header();
        Ok(request)
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::from_url(Method::GET, url)
    }

    pub fn builder(method: Method, url: &str) -> RequestBuilder {
        RequestBuilder {
            request: Self::from_url(method, url),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) {
        self.scheme = Some(scheme.into());
        self.update_host_header();
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
        self.update_host_header();
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn set_port(&mut self, port: Option<u16>) {
        self.port = port;
        self.update_host_header();
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = normalize_path(path.into());
    }

    /// The encoded query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Appends one form-encoded `name=value` pair after any existing query.
    pub fn add_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        let query = self.query.get_or_insert_with(String::new);
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(
            &url::form_urlencoded::Serializer::new(String::new())
                .append_pair(&name, &value)
                .finish(),
        );
    }

    /// Path plus the query string, as written on the request line.
    pub fn resource(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Applied as the socket receive timeout while the exchange runs.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Streams `body` after the head. The caller sets `Content-Length` or
    /// the server reads until the connection closes.
    pub fn set_body(&mut self, body: impl Read + Send + 'static) {
        self.body = Some(Box::new(body));
    }

    /// An in-memory body; `Content-Length` is set to match.
    pub fn set_body_bytes(&mut self, body: impl Into<Bytes>) {
        let body = body.into();
        self.headers.set("Content-Length", body.len().to_string());
        self.body = Some(Box::new(body.reader()));
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Hands the body over to the writer; it is consumed by one send.
    pub fn take_body(&mut self) -> Option<Box<dyn Read + Send>> {
        self.body.take()
    }

    fn update_host_header(&mut self) {
        if self.host.is_empty() {
            self.headers.remove("Host");
            return;
        }
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let default = self.scheme.as_deref().and_then(default_port);
        let value = match self.port {
            Some(port) if Some(port) != default => format!("{host}:{port}"),
            _ => host,
        };
        self.headers.set("Host", value);
    }
}

fn normalize_path(path: String) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

/// Fluent construction of an [`HttpRequest`]. A URL parse failure surfaces
/// from [`build`](RequestBuilder::build).
pub struct RequestBuilder {
    request: Result<HttpRequest>,
}

impl RequestBuilder {
    fn map(mut self, f: impl FnOnce(&mut HttpRequest)) -> Self {
        if let Ok(request) = &mut self.request {
            f(request);
        }
        self
    }

    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.map(|r| r.headers.set(name, value))
    }

    pub fn query(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.map(|r| r.add_query(name, value))
    }

    pub fn version(self, version: Version) -> Self {
        self.map(|r| r.version = version)
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|r| r.timeout = Some(timeout))
    }

    pub fn body(self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.map(|r| r.set_body_bytes(body))
    }

    pub fn build(self) -> Result<HttpRequest> {
        self.request
    }
}
