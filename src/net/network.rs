//! Networks (address + prefix length) and host ranges.

use std::fmt;
use std::str::FromStr;

use super::address::{AddressParseError, AddressV4, AddressV6};

/// An inclusive range of addresses, iterated in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange<A> {
    next: Option<A>,
    last: A,
}

impl<A: Copy + PartialOrd> AddressRange<A> {
    fn inclusive(first: A, last: A) -> Self {
        let next = (first <= last).then_some(first);
        Self { next, last }
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_none()
    }

    pub fn first(&self) -> Option<A> {
        self.next
    }

    pub fn last(&self) -> Option<A> {
        self.next.map(|_| self.last)
    }
}

impl AddressRange<AddressV4> {
    pub fn contains(&self, addr: &AddressV4) -> bool {
        self.next.is_some_and(|first| first <= *addr && *addr <= self.last)
    }
}

impl AddressRange<AddressV6> {
    pub fn contains(&self, addr: &AddressV6) -> bool {
        self.next
            .is_some_and(|first| first.to_u128() <= addr.to_u128() && addr.to_u128() <= self.last.to_u128())
    }
}

impl Iterator for AddressRange<AddressV4> {
    type Item = AddressV4;

    fn next(&mut self) -> Option<AddressV4> {
        let current = self.next?;
        self.next = (current != self.last).then(|| current.next());
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(first) => {
                let n = (self.last.to_u32() - first.to_u32()) as usize + 1;
                (n, Some(n))
            }
            None => (0, Some(0)),
        }
    }
}

impl Iterator for AddressRange<AddressV6> {
    type Item = AddressV6;

    fn next(&mut self) -> Option<AddressV6> {
        let current = self.next?;
        self.next = (current.to_u128() != self.last.to_u128()).then(|| current.next());
        Some(current)
    }
}

fn parse_prefix(s: &str, max: u8) -> Result<(&str, u8), AddressParseError> {
    let err = || AddressParseError(s.to_string());
    let (addr, len) = s.split_once('/').ok_or_else(err)?;
    if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    let len: u8 = len.parse().map_err(|_| err())?;
    if len > max {
        return Err(err());
    }
    Ok((addr, len))
}

/// An IPv4 network, e.g. `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkV4 {
    address: AddressV4,
    prefix_len: u8,
}

impl NetworkV4 {
    /// Returns `None` when `prefix_len` exceeds 32.
    pub fn new(address: AddressV4, prefix_len: u8) -> Option<Self> {
        (prefix_len <= 32).then_some(Self { address, prefix_len })
    }

    pub fn address(&self) -> AddressV4 {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_len
    }

    pub fn netmask(&self) -> AddressV4 {
        let mask = if self.prefix_len == 0 { 0 } else { u32::MAX << (32 - self.prefix_len) };
        AddressV4::from_u32(mask)
    }

    pub fn network(&self) -> AddressV4 {
        AddressV4::from_u32(self.address.to_u32() & self.netmask().to_u32())
    }

    pub fn broadcast(&self) -> AddressV4 {
        AddressV4::from_u32(self.network().to_u32() | !self.netmask().to_u32())
    }

    /// The network with host bits cleared.
    pub fn canonical(&self) -> Self {
        Self { address: self.network(), prefix_len: self.prefix_len }
    }

    pub fn is_host(&self) -> bool {
        self.prefix_len == 32
    }

    /// Usable host addresses: the address itself for a /32, otherwise
    /// network+1 through broadcast-1.
    pub fn hosts(&self) -> AddressRange<AddressV4> {
        if self.is_host() {
            return AddressRange::inclusive(self.address, self.address);
        }
        let first = self.network().to_u32().wrapping_add(1);
        let last = self.broadcast().to_u32().wrapping_sub(1);
        // a /31 has no addresses strictly between network and broadcast
        if first > last {
            return AddressRange { next: None, last: self.address };
        }
        AddressRange::inclusive(AddressV4::from_u32(first), AddressV4::from_u32(last))
    }

    pub fn is_subnet_of(&self, other: &NetworkV4) -> bool {
        other.prefix_len < self.prefix_len
            && NetworkV4 { address: self.address, prefix_len: other.prefix_len }.network() == other.network()
    }
}

impl FromStr for NetworkV4 {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = parse_prefix(s, 32)?;
        Ok(Self { address: addr.parse()?, prefix_len: len })
    }
}

impl fmt::Display for NetworkV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// An IPv6 network, e.g. `2001:db8::/32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkV6 {
    address: AddressV6,
    prefix_len: u8,
}

impl NetworkV6 {
    /// Returns `None` when `prefix_len` exceeds 128.
    pub fn new(address: AddressV6, prefix_len: u8) -> Option<Self> {
        (prefix_len <= 128).then_some(Self { address, prefix_len })
    }

    pub fn address(&self) -> AddressV6 {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_len
    }

    fn mask(&self) -> u128 {
        if self.prefix_len == 0 { 0 } else { u128::MAX << (128 - self.prefix_len) }
    }

    pub fn network(&self) -> AddressV6 {
        AddressV6::from_bytes((self.address.to_u128() & self.mask()).to_be_bytes(), 0)
    }

    pub fn canonical(&self) -> Self {
        Self { address: self.network(), prefix_len: self.prefix_len }
    }

    pub fn is_host(&self) -> bool {
        self.prefix_len == 128
    }

    /// The address itself for a /128, otherwise every address from the
    /// network address through the last address of the prefix.
    pub fn hosts(&self) -> AddressRange<AddressV6> {
        if self.is_host() {
            return AddressRange { next: Some(self.address), last: self.address };
        }
        let first = self.network();
        let last = first.with_u128(first.to_u128() | !self.mask());
        AddressRange { next: Some(first), last }
    }

    pub fn is_subnet_of(&self, other: &NetworkV6) -> bool {
        other.prefix_len < self.prefix_len
            && NetworkV6 { address: self.address, prefix_len: other.prefix_len }.network() == other.network()
    }
}

impl FromStr for NetworkV6 {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = parse_prefix(s, 128)?;
        Ok(Self { address: addr.parse()?, prefix_len: len })
    }
}

impl fmt::Display for NetworkV6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}
