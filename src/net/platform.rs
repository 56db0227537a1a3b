//! Platform primitives: address families, socket types, protocols,
//! and byte-order conversion.

use std::fmt;
use std::io;

/// Address family of a socket or endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub(crate) fn domain(self) -> socket2::Domain {
        match self {
            Family::V4 => socket2::Domain::IPV4,
            Family::V6 => socket2::Domain::IPV6,
        }
    }

    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            Family::V4 => libc::AF_INET,
            Family::V6 => libc::AF_INET6,
        }
    }
}

/// Socket type: connection-oriented stream or datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    Stream,
    Datagram,
}

impl SocketType {
    pub(crate) fn as_socket2(self) -> socket2::Type {
        match self {
            SocketType::Stream => socket2::Type::STREAM,
            SocketType::Datagram => socket2::Type::DGRAM,
        }
    }

    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            SocketType::Stream => libc::SOCK_STREAM,
            SocketType::Datagram => libc::SOCK_DGRAM,
        }
    }
}

/// Transport protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpProtocol {
    Tcp,
    Udp,
}

impl IpProtocol {
    fn as_socket2(self) -> socket2::Protocol {
        match self {
            IpProtocol::Tcp => socket2::Protocol::TCP,
            IpProtocol::Udp => socket2::Protocol::UDP,
        }
    }
}

/// The (family, type, protocol) triple a socket is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protocol {
    family: Family,
    socket_type: SocketType,
    protocol: IpProtocol,
}

impl Protocol {
    pub fn tcp(family: Family) -> Self {
        Self {
            family,
            socket_type: SocketType::Stream,
            protocol: IpProtocol::Tcp,
        }
    }

    pub fn udp(family: Family) -> Self {
        Self {
            family,
            socket_type: SocketType::Datagram,
            protocol: IpProtocol::Udp,
        }
    }

    pub fn tcp_v4() -> Self {
        Self::tcp(Family::V4)
    }

    pub fn tcp_v6() -> Self {
        Self::tcp(Family::V6)
    }

    pub fn udp_v4() -> Self {
        Self::udp(Family::V4)
    }

    pub fn udp_v6() -> Self {
        Self::udp(Family::V6)
    }

    /// Same type and protocol, other family.
    pub fn with_family(self, family: Family) -> Self {
        Self { family, ..self }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn protocol(&self) -> IpProtocol {
        self.protocol
    }

    pub(crate) fn create(&self) -> io::Result<socket2::Socket> {
        socket2::Socket::new(
            self.family.domain(),
            self.socket_type.as_socket2(),
            Some(self.protocol.as_socket2()),
        )
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.protocol {
            IpProtocol::Tcp => "tcp",
            IpProtocol::Udp => "udp",
        };
        let family = match self.family {
            Family::V4 => "v4",
            Family::V6 => "v6",
        };
        write!(f, "{name}/{family}")
    }
}

pub fn host_to_network_u16(value: u16) -> u16 {
    value.to_be()
}

pub fn network_to_host_u16(value: u16) -> u16 {
    u16::from_be(value)
}

pub fn host_to_network_u32(value: u32) -> u32 {
    value.to_be()
}

pub fn network_to_host_u32(value: u32) -> u32 {
    u32::from_be(value)
}
