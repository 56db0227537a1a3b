//! IP address types.
//!
//! [`AddressV4`] and [`AddressV6`] keep their bytes in network order.
//! [`Address`] is the tagged union of the two; ordering puts every v4
//! address before every v6 address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use super::platform::Family;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address syntax: {0:?}")]
pub struct AddressParseError(pub String);

/// An IPv4 address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressV4 {
    octets: [u8; 4],
}

impl AddressV4 {
    pub const ANY: AddressV4 = AddressV4 { octets: [0, 0, 0, 0] };
    pub const LOOPBACK: AddressV4 = AddressV4 { octets: [127, 0, 0, 1] };
    pub const BROADCAST: AddressV4 = AddressV4 { octets: [255, 255, 255, 255] };

    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self { octets: [a, b, c, d] }
    }

    pub const fn from_octets(octets: [u8; 4]) -> Self {
        Self { octets }
    }

    /// Builds an address from a host-order integer.
    pub const fn from_u32(value: u32) -> Self {
        Self { octets: value.to_be_bytes() }
    }

    pub const fn octets(&self) -> [u8; 4] {
        self.octets
    }

    /// The address as a host-order integer.
    pub const fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.octets)
    }

    pub fn is_unspecified(&self) -> bool {
        self.to_u32() == 0
    }

    pub fn is_loopback(&self) -> bool {
        self.octets[0] == 127
    }

    pub fn is_multicast(&self) -> bool {
        self.octets[0] & 0xf0 == 0xe0
    }

    pub fn is_private(&self) -> bool {
        Ipv4Addr::from(*self).is_private()
    }

    pub fn is_link_local(&self) -> bool {
        self.octets[0] == 169 && self.octets[1] == 254
    }

    /// The next address, wrapping past 255.255.255.255.
    pub fn next(&self) -> Self {
        Self::from_u32(self.to_u32().wrapping_add(1))
    }

    /// The previous address, wrapping below 0.0.0.0.
    pub fn prev(&self) -> Self {
        Self::from_u32(self.to_u32().wrapping_sub(1))
    }

    pub fn increment(&mut self) {
        *self = self.next();
    }

    pub fn decrement(&mut self) {
        *self = self.prev();
    }

    /// `::ffff:a.b.c.d`
    pub fn to_v4_mapped(&self) -> AddressV6 {
        let mut bytes = [0u8; 16];
        bytes[10] = 0xff;
        bytes[11] = 0xff;
        bytes[12..].copy_from_slice(&self.octets);
        AddressV6::from_bytes(bytes, 0)
    }
}

impl From<Ipv4Addr> for AddressV4 {
    fn from(addr: Ipv4Addr) -> Self {
        Self { octets: addr.octets() }
    }
}

impl From<AddressV4> for Ipv4Addr {
    fn from(addr: AddressV4) -> Self {
        Ipv4Addr::from(addr.octets)
    }
}

impl FromStr for AddressV4 {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ipv4Addr>()
            .map(Self::from)
            .map_err(|_| AddressParseError(s.to_string()))
    }
}

impl fmt::Display for AddressV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// An IPv6 address with its scope id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressV6 {
    bytes: [u8; 16],
    scope_id: u32,
}

impl AddressV6 {
    pub const ANY: AddressV6 = AddressV6 { bytes: [0; 16], scope_id: 0 };
    pub const LOOPBACK: AddressV6 = AddressV6 {
        bytes: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        scope_id: 0,
    };

    pub const fn from_bytes(bytes: [u8; 16], scope_id: u32) -> Self {
        Self { bytes, scope_id }
    }

    pub const fn bytes(&self) -> [u8; 16] {
        self.bytes
    }

    pub const fn scope_id(&self) -> u32 {
        self.scope_id
    }

    pub fn set_scope_id(&mut self, scope_id: u32) {
        self.scope_id = scope_id;
    }

    pub(crate) const fn to_u128(&self) -> u128 {
        u128::from_be_bytes(self.bytes)
    }

    pub(crate) const fn with_u128(&self, value: u128) -> Self {
        Self { bytes: value.to_be_bytes(), scope_id: self.scope_id }
    }

    pub fn is_unspecified(&self) -> bool {
        self.to_u128() == 0
    }

    pub fn is_loopback(&self) -> bool {
        self.to_u128() == 1
    }

    pub fn is_multicast(&self) -> bool {
        self.bytes[0] == 0xff
    }

    pub fn is_link_local(&self) -> bool {
        self.bytes[0] == 0xfe && self.bytes[1] & 0xc0 == 0x80
    }

    pub fn is_v4_mapped(&self) -> bool {
        self.bytes[..10].iter().all(|b| *b == 0) && self.bytes[10] == 0xff && self.bytes[11] == 0xff
    }

    /// The embedded v4 address of a `::ffff:a.b.c.d` address.
    pub fn to_v4(&self) -> Option<AddressV4> {
        if !self.is_v4_mapped() {
            return None;
        }
        let mut octets = [0u8; 4];
        octets.copy_from_slice(&self.bytes[12..]);
        Some(AddressV4::from_octets(octets))
    }

    /// The next address; the carry runs into the earlier bytes.
    pub fn next(&self) -> Self {
        self.with_u128(self.to_u128().wrapping_add(1))
    }

    pub fn prev(&self) -> Self {
        self.with_u128(self.to_u128().wrapping_sub(1))
    }

    pub fn increment(&mut self) {
        *self = self.next();
    }

    pub fn decrement(&mut self) {
        *self = self.prev();
    }
}

impl From<Ipv6Addr> for AddressV6 {
    fn from(addr: Ipv6Addr) -> Self {
        Self { bytes: addr.octets(), scope_id: 0 }
    }
}

impl From<AddressV6> for Ipv6Addr {
    fn from(addr: AddressV6) -> Self {
        Ipv6Addr::from(addr.bytes)
    }
}

impl FromStr for AddressV6 {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_string());
        let (addr, scope) = match s.split_once('%') {
            Some((addr, scope)) => (addr, Some(scope)),
            None => (s, None),
        };
        let mut parsed = AddressV6::from(addr.parse::<Ipv6Addr>().map_err(|_| err())?);
        if let Some(scope) = scope {
            parsed.scope_id = match scope.parse::<u32>() {
                Ok(id) => id,
                // link-local scopes may name an interface
                Err(_) => interface_index(scope).ok_or_else(err)?,
            };
        }
        Ok(parsed)
    }
}

fn interface_index(name: &str) -> Option<u32> {
    let name = std::ffi::CString::new(name).ok()?;
    // SAFETY: `name` is a valid NUL-terminated string for the duration of the call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    (index != 0).then_some(index)
}

impl fmt::Display for AddressV6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv6Addr::from(self.bytes))?;
        if self.scope_id != 0 {
            write!(f, "%{}", self.scope_id)?;
        }
        Ok(())
    }
}

/// Either an IPv4 or an IPv6 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    V4(AddressV4),
    V6(AddressV6),
}

impl Address {
    pub fn family(&self) -> Family {
        match self {
            Address::V4(_) => Family::V4,
            Address::V6(_) => Family::V6,
        }
    }

    pub fn is_v4(&self) -> bool {
        matches!(self, Address::V4(_))
    }

    pub fn is_v6(&self) -> bool {
        matches!(self, Address::V6(_))
    }

    pub fn as_v4(&self) -> Option<AddressV4> {
        match self {
            Address::V4(a) => Some(*a),
            Address::V6(_) => None,
        }
    }

    pub fn as_v6(&self) -> Option<AddressV6> {
        match self {
            Address::V4(_) => None,
            Address::V6(a) => Some(*a),
        }
    }

    pub fn is_unspecified(&self) -> bool {
        match self {
            Address::V4(a) => a.is_unspecified(),
            Address::V6(a) => a.is_unspecified(),
        }
    }

    pub fn is_loopback(&self) -> bool {
        match self {
            Address::V4(a) => a.is_loopback(),
            Address::V6(a) => a.is_loopback(),
        }
    }

    pub fn is_multicast(&self) -> bool {
        match self {
            Address::V4(a) => a.is_multicast(),
            Address::V6(a) => a.is_multicast(),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Address::V4(a) => Address::V4(a.next()),
            Address::V6(a) => Address::V6(a.next()),
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Address::V4(a) => Address::V4(a.prev()),
            Address::V6(a) => Address::V6(a.prev()),
        }
    }

    pub fn increment(&mut self) {
        *self = self.next();
    }

    pub fn decrement(&mut self) {
        *self = self.prev();
    }

    /// The unspecified address of `family`.
    pub fn any(family: Family) -> Self {
        match family {
            Family::V4 => Address::V4(AddressV4::ANY),
            Family::V6 => Address::V6(AddressV6::ANY),
        }
    }

    pub fn loopback(family: Family) -> Self {
        match family {
            Family::V4 => Address::V4(AddressV4::LOOPBACK),
            Family::V6 => Address::V6(AddressV6::LOOPBACK),
        }
    }
}

impl From<AddressV4> for Address {
    fn from(addr: AddressV4) -> Self {
        Address::V4(addr)
    }
}

impl From<AddressV6> for Address {
    fn from(addr: AddressV6) -> Self {
        Address::V6(addr)
    }
}

impl From<IpAddr> for Address {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => Address::V4(a.into()),
            IpAddr::V6(a) => Address::V6(a.into()),
        }
    }
}

impl From<Address> for IpAddr {
    fn from(addr: Address) -> Self {
        match addr {
            Address::V4(a) => IpAddr::V4(a.into()),
            Address::V6(a) => IpAddr::V6(a.into()),
        }
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(v4) = s.parse::<AddressV4>() {
            return Ok(Address::V4(v4));
        }
        s.parse::<AddressV6>().map(Address::V6)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::V4(a) => a.fmt(f),
            Address::V6(a) => a.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v6_increment_carries_into_earlier_bytes() {
        let addr: AddressV6 = "::ffff:ffff".parse().unwrap();
        assert_eq!(addr.next().to_string(), "::1:0:0");
    }

    #[test]
    fn v6_keeps_scope_across_arithmetic() {
        let addr: AddressV6 = "fe80::1%3".parse().unwrap();
        assert_eq!(addr.scope_id(), 3);
        assert_eq!(addr.next().scope_id(), 3);
        assert_eq!(addr.to_string(), "fe80::1%3");
    }
}
