use std::fmt;
use std::net::{SocketAddr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;

use super::address::{Address, AddressParseError, AddressV4, AddressV6};
use super::platform::Family;

/// One side of a connection: address, port and family.
///
/// The variant mirrors which OS socket address representation backs the
/// endpoint, but the accessors work the same for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    V4 { address: AddressV4, port: u16 },
    V6 { address: AddressV6, port: u16, flow_info: u32 },
}

impl Endpoint {
    pub fn new(address: impl Into<Address>, port: u16) -> Self {
        match address.into() {
            Address::V4(address) => Endpoint::V4 { address, port },
            Address::V6(address) => Endpoint::V6 { address, port, flow_info: 0 },
        }
    }

    /// The unspecified address of `family` with `port`, used for binding.
    pub fn any(family: Family, port: u16) -> Self {
        Self::new(Address::any(family), port)
    }

    pub fn loopback(family: Family, port: u16) -> Self {
        Self::new(Address::loopback(family), port)
    }

    pub fn address(&self) -> Address {
        match self {
            Endpoint::V4 { address, .. } => Address::V4(*address),
            Endpoint::V6 { address, .. } => Address::V6(*address),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Endpoint::V4 { port, .. } | Endpoint::V6 { port, .. } => *port,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Endpoint::V4 { .. } => Family::V4,
            Endpoint::V6 { .. } => Family::V6,
        }
    }

    pub fn set_port(&mut self, new_port: u16) {
        match self {
            Endpoint::V4 { port, .. } | Endpoint::V6 { port, .. } => *port = new_port,
        }
    }

    /// Replaces the address; the variant follows the new address family.
    pub fn set_address(&mut self, address: impl Into<Address>) {
        *self = Self::new(address, self.port());
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        match *self {
            Endpoint::V4 { address, port } => SocketAddr::V4(SocketAddrV4::new(address.into(), port)),
            Endpoint::V6 { address, port, flow_info } => {
                SocketAddr::V6(SocketAddrV6::new(address.into(), port, flow_info, address.scope_id()))
            }
        }
    }

    pub(crate) fn to_sock_addr(&self) -> socket2::SockAddr {
        socket2::SockAddr::from(self.to_socket_addr())
    }

    pub(crate) fn from_sock_addr(addr: &socket2::SockAddr) -> Option<Self> {
        addr.as_socket().map(Self::from)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(a) => Endpoint::V4 { address: (*a.ip()).into(), port: a.port() },
            SocketAddr::V6(a) => Endpoint::V6 {
                address: AddressV6::from_bytes(a.ip().octets(), a.scope_id()),
                port: a.port(),
                flow_info: a.flowinfo(),
            },
        }
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(ep: Endpoint) -> Self {
        ep.to_socket_addr()
    }
}

impl FromStr for Endpoint {
    type Err = AddressParseError;

    /// Parses `a.b.c.d:port` or `[v6addr%scope]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_string());
        let (addr, port) = s.rsplit_once(':').ok_or_else(err)?;
        let port: u16 = port.parse().map_err(|_| err())?;
        let address: Address = match addr.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
            Some(v6) => Address::V6(v6.parse()?),
            None => Address::V4(addr.parse()?),
        };
        Ok(Self::new(address, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::V4 { address, port } => write!(f, "{address}:{port}"),
            Endpoint::V6 { address, port, .. } => write!(f, "[{address}]:{port}"),
        }
    }
}
