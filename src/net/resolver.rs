//! Name resolution through the OS resolver (`getaddrinfo` / `getnameinfo`).
//!
//! Results keep the order the OS reports them in; that order is the order in
//! which [`connect`](crate::net::connect) later tries the candidates.

use std::ffi::{CStr, CString};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ops::BitOr;
use std::ptr;

use tracing::debug;

use crate::context::Context;
use crate::error::{Error, ResolverError, Result};

use super::endpoint::Endpoint;
use super::platform::{Family, Protocol, SocketType};

/// Flags passed to the OS resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolverFlags(libc::c_int);

impl ResolverFlags {
    pub const NONE: ResolverFlags = ResolverFlags(0);
    /// Results are intended for binding (unspecified address when no host).
    pub const PASSIVE: ResolverFlags = ResolverFlags(libc::AI_PASSIVE);
    /// Report the canonical name of the host.
    pub const CANONICAL_NAME: ResolverFlags = ResolverFlags(libc::AI_CANONNAME);
    /// The host must be a numeric address; no lookup is made.
    pub const NUMERIC_HOST: ResolverFlags = ResolverFlags(libc::AI_NUMERICHOST);
    /// The service must be a numeric port.
    pub const NUMERIC_SERVICE: ResolverFlags = ResolverFlags(libc::AI_NUMERICSERV);
    /// Return v4-mapped v6 addresses when no v6 address exists.
    pub const V4_MAPPED: ResolverFlags = ResolverFlags(libc::AI_V4MAPPED);
    /// With `V4_MAPPED`, return both v6 and v4-mapped addresses.
    pub const ALL_MATCHING: ResolverFlags = ResolverFlags(libc::AI_ALL);
    /// Only return families configured on the host.
    pub const ADDRESS_CONFIGURED: ResolverFlags = ResolverFlags(libc::AI_ADDRCONFIG);

    pub fn bits(&self) -> libc::c_int {
        self.0
    }

    pub fn contains(&self, other: ResolverFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ResolverFlags {
    type Output = ResolverFlags;

    fn bitor(self, rhs: Self) -> Self {
        ResolverFlags(self.0 | rhs.0)
    }
}

/// One resolved candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverEntry {
    endpoint: Endpoint,
    host_name: String,
    service_name: String,
}

impl ResolverEntry {
    pub fn new(endpoint: Endpoint, host_name: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            endpoint,
            host_name: host_name.into(),
            service_name: service_name.into(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// The ordered candidates produced by one resolve call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverResult {
    entries: Vec<ResolverEntry>,
}

impl ResolverResult {
    /// Builds a result from entries already in connection-attempt order.
    pub fn from_entries(entries: Vec<ResolverEntry>) -> Self {
        Self { entries }
    }

    /// A result holding a single endpoint, e.g. for a direct connect.
    pub fn from_endpoint(endpoint: Endpoint) -> Self {
        let host = endpoint.address().to_string();
        let service = endpoint.port().to_string();
        Self::from_entries(vec![ResolverEntry::new(endpoint, host, service)])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolverEntry> {
        self.entries.iter()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.entries.iter().map(|e| e.endpoint)
    }
}

impl<'a> IntoIterator for &'a ResolverResult {
    type Item = &'a ResolverEntry;
    type IntoIter = std::slice::Iter<'a, ResolverEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for ResolverResult {
    type Item = ResolverEntry;
    type IntoIter = std::vec::IntoIter<ResolverEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Resolves host/service pairs for one socket type.
#[derive(Debug, Clone)]
pub struct Resolver {
    _ctx: Context,
    socket_type: SocketType,
    family: Option<Family>,
}

impl Resolver {
    pub fn new(ctx: &Context, socket_type: SocketType) -> Self {
        Self {
            _ctx: ctx.clone(),
            socket_type,
            family: None,
        }
    }

    /// Resolver for stream (TCP) endpoints.
    pub fn tcp(ctx: &Context) -> Self {
        Self::new(ctx, SocketType::Stream)
    }

    /// Resolver for datagram (UDP) endpoints.
    pub fn udp(ctx: &Context) -> Self {
        Self::new(ctx, SocketType::Datagram)
    }

    /// Restricts results to one address family.
    pub fn with_family(mut self, family: Family) -> Self {
        self.family = Some(family);
        self
    }

    /// Protocol to open a socket with for `endpoint`.
    pub fn protocol_for(&self, endpoint: &Endpoint) -> Protocol {
        match self.socket_type {
            SocketType::Stream => Protocol::tcp(endpoint.family()),
            SocketType::Datagram => Protocol::udp(endpoint.family()),
        }
    }

    /// Forward lookup. An empty `host` or `service` is passed to the OS as
    /// absent.
    pub fn resolve(&self, host: &str, service: &str, flags: ResolverFlags) -> Result<ResolverResult> {
        let c_host = optional_cstring(host, ResolverError::HostNotFound)?;
        let c_service = optional_cstring(service, ResolverError::ServiceNotFound)?;

        // SAFETY: an all-zero addrinfo is a valid "no hints" value.
        let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
        hints.ai_flags = flags.bits();
        hints.ai_family = self.family.map_or(libc::AF_UNSPEC, Family::as_raw);
        hints.ai_socktype = self.socket_type.as_raw();

        let mut list: *mut libc::addrinfo = ptr::null_mut();
        // SAFETY: every pointer is either null or a valid NUL-terminated string,
        // `hints` is initialized and `list` receives the allocated result.
        let rc = unsafe {
            libc::getaddrinfo(
                c_host.as_ref().map_or(ptr::null(), |h| h.as_ptr()),
                c_service.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
                &hints,
                &mut list,
            )
        };
        if rc != 0 {
            let err = gai_error(rc);
            debug!(host, service, error = %err, "resolve failed");
            return Err(err);
        }
        let list = AddrInfoList(list);

        let mut host_name = host.to_string();
        let mut entries = Vec::new();
        let mut cursor = list.0;
        while !cursor.is_null() {
            // SAFETY: `cursor` walks the list returned by getaddrinfo, which
            // stays alive until `list` drops.
            let info = unsafe { &*cursor };
            if entries.is_empty() && !info.ai_canonname.is_null() && flags.contains(ResolverFlags::CANONICAL_NAME) {
                // SAFETY: ai_canonname is a NUL-terminated string owned by the list.
                host_name = unsafe { CStr::from_ptr(info.ai_canonname) }.to_string_lossy().into_owned();
            }
            // SAFETY: ai_addr points at ai_addrlen bytes of socket address.
            if let Some(addr) = unsafe { decode_sockaddr(info.ai_addr, info.ai_addrlen) } {
                entries.push(ResolverEntry::new(Endpoint::from(addr), host_name.clone(), service));
            }
            cursor = info.ai_next;
        }

        debug!(host, service, candidates = entries.len(), "resolved");
        Ok(ResolverResult::from_entries(entries))
    }

    /// Reverse lookup of an endpoint to its host and service names.
    pub fn reverse(&self, endpoint: &Endpoint) -> Result<ResolverResult> {
        let addr = endpoint.to_sock_addr();
        let mut host = [0 as libc::c_char; 1025];
        let mut service = [0 as libc::c_char; 32];
        let flags = match self.socket_type {
            SocketType::Datagram => libc::NI_DGRAM,
            SocketType::Stream => 0,
        };
        // SAFETY: `addr` is a valid socket address of `addr.len()` bytes and
        // both output buffers are writable for their declared lengths.
        let rc = unsafe {
            libc::getnameinfo(
                addr.as_ptr(),
                addr.len(),
                host.as_mut_ptr(),
                host.len() as libc::socklen_t,
                service.as_mut_ptr(),
                service.len() as libc::socklen_t,
                flags,
            )
        };
        if rc != 0 {
            return Err(gai_error(rc));
        }
        // SAFETY: getnameinfo NUL-terminates both buffers on success.
        let (host, service) = unsafe {
            (
                CStr::from_ptr(host.as_ptr()).to_string_lossy().into_owned(),
                CStr::from_ptr(service.as_ptr()).to_string_lossy().into_owned(),
            )
        };
        Ok(ResolverResult::from_entries(vec![ResolverEntry::new(*endpoint, host, service)]))
    }
}

struct AddrInfoList(*mut libc::addrinfo);

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer came from a successful getaddrinfo call and is freed once.
            unsafe { libc::freeaddrinfo(self.0) };
        }
    }
}

/// An interior NUL can never name anything, so it fails as `not_found`.
fn optional_cstring(s: &str, not_found: ResolverError) -> Result<Option<CString>> {
    if s.is_empty() {
        return Ok(None);
    }
    CString::new(s).map(Some).map_err(|_| Error::Resolver(not_found))
}

/// # Safety
/// `addr` must be null or point at `len` readable bytes of socket address.
unsafe fn decode_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<SocketAddr> {
    if addr.is_null() {
        return None;
    }
    let family = unsafe { (*addr).sa_family } as libc::c_int;
    match family {
        libc::AF_INET if len as usize >= std::mem::size_of::<libc::sockaddr_in>() => {
            let sa = unsafe { &*(addr as *const libc::sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(sa.sin_addr.s_addr));
            Some(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(sa.sin_port))))
        }
        libc::AF_INET6 if len as usize >= std::mem::size_of::<libc::sockaddr_in6>() => {
            let sa = unsafe { &*(addr as *const libc::sockaddr_in6) };
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sa.sin6_addr.s6_addr),
                u16::from_be(sa.sin6_port),
                sa.sin6_flowinfo,
                sa.sin6_scope_id,
            )))
        }
        _ => None,
    }
}

fn gai_error(code: libc::c_int) -> Error {
    match code {
        libc::EAI_NONAME | libc::EAI_FAIL => Error::Resolver(ResolverError::HostNotFound),
        libc::EAI_AGAIN => Error::Resolver(ResolverError::TryAgain),
        libc::EAI_SERVICE => Error::Resolver(ResolverError::ServiceNotFound),
        libc::EAI_SYSTEM => Error::Os(io::Error::last_os_error()),
        _ => {
            // SAFETY: gai_strerror returns a static NUL-terminated message.
            let message = unsafe { CStr::from_ptr(libc::gai_strerror(code)) };
            Error::Os(io::Error::other(message.to_string_lossy().into_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let flags = ResolverFlags::NUMERIC_HOST | ResolverFlags::NUMERIC_SERVICE;
        assert!(flags.contains(ResolverFlags::NUMERIC_HOST));
        assert!(!flags.contains(ResolverFlags::PASSIVE));
    }

    #[test]
    fn gai_codes_map_to_resolver_domain() {
        assert!(matches!(gai_error(libc::EAI_NONAME), Error::Resolver(ResolverError::HostNotFound)));
        assert!(gai_error(libc::EAI_AGAIN).is_try_again());
        assert!(matches!(gai_error(libc::EAI_SERVICE), Error::Resolver(ResolverError::ServiceNotFound)));
    }
}
