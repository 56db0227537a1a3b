//! HTTP/1.x client protocol engine.
//!
//! The engine is organized into several submodules:
//!
//! - **`request`**: outgoing request model and builder
//! - **`response`**: response head and status codes
//! - **`headers`**: ordered, case-insensitive header map
//! - **`writer`**: serializes a request onto any `Write`
//! - **`parser`**: parses a response head from any `BufRead`
//! - **`chunked`**: decoder for the chunked transfer coding
//! - **`client`**: resolve, connect, exchange
//!
//! # Exchange
//!
//! ```text
//!   resolve host ──► connect (first candidate that accepts)
//!        │
//!        ▼
//!   set receive timeout ──► write head + body ──► flush
//!        │
//!        ▼
//!   parse head ──► body sink?
//!                    ├─ Transfer-Encoding: chunked → ChunkedDecoder
//!                    ├─ Content-Length: n          → exactly n bytes
//!                    └─ otherwise                  → until EOF
//! ```
//!
//! # Example
//!
//! ```no_run
//! use blocknet::context::Context;
//! use blocknet::http::{HttpClient, HttpRequest};
//!
//! fn main() -> blocknet::error::Result<()> {
//!     let ctx = Context::new();
//!     let client = HttpClient::http(&ctx);
//!     let mut request = HttpRequest::get("http://example.com/")?;
//!     let mut body = Vec::new();
//!     let response = client.send(&mut request, Some(&mut body))?;
//!     println!("{} {}", response.status(), response.reason());
//!     Ok(())
//! }
//! ```

pub mod chunked;
pub mod client;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod version;
pub mod writer;

pub use chunked::{ChunkState, ChunkedDecoder};
pub use client::{read_body, HttpClient, Scheme};
pub use headers::Headers;
pub use parser::{read_response, ResponseParser, MAX_HEADER_BYTES};
pub use request::{HttpRequest, Method, RequestBuilder};
pub use response::{HttpResponse, StatusCode};
pub use version::Version;
pub use writer::{serialize_head, write_request};
