//! blocknet - blocking client networking stack
//!
//! Addresses and name resolution, sockets, a buffered stream adapter, a TLS
//! client layer and an HTTP/1.x client, all built on blocking OS calls.

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod net;
pub mod stream;
pub mod tls;
