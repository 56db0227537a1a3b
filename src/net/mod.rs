//! Addresses, name resolution and blocking sockets.
//!
//! # Layers
//!
//! - **`platform`**: families, socket types, protocols and byte order
//! - **`address`** / **`network`** / **`endpoint`**: the address model
//! - **`resolver`**: host/service lookups producing ordered candidates
//! - **`socket`** / **`acceptor`** / **`options`**: the blocking socket core
//! - **`connect`**: try each resolved candidate until one connects
//!
//! # Example
//!
//! ```no_run
//! use blocknet::context::Context;
//! use blocknet::net::{connect, Resolver, ResolverFlags, Socket};
//!
//! # fn main() -> blocknet::error::Result<()> {
//! let ctx = Context::new();
//! let endpoints = Resolver::tcp(&ctx).resolve("example.com", "80", ResolverFlags::NONE)?;
//! let mut socket = Socket::new(&ctx);
//! let peer = connect(&mut socket, &endpoints)?;
//! println!("connected to {peer}");
//! # Ok(())
//! # }
//! ```

pub mod acceptor;
pub mod address;
pub mod connect;
pub mod endpoint;
pub mod network;
pub mod options;
pub mod platform;
pub mod resolver;
pub mod socket;
pub mod transport;

pub use acceptor::Acceptor;
pub use address::{Address, AddressParseError, AddressV4, AddressV6};
pub use connect::{connect, connect_if};
pub use endpoint::Endpoint;
pub use network::{AddressRange, NetworkV4, NetworkV6};
pub use platform::{Family, IpProtocol, Protocol, SocketType};
pub use resolver::{Resolver, ResolverEntry, ResolverFlags, ResolverResult};
pub use socket::{Socket, SocketState, WaitKind};
pub use transport::Transport;
