use tracing::{debug, warn};

use crate::error::{Result, SocketError};

use super::endpoint::Endpoint;
use super::platform::Protocol;
use super::resolver::ResolverResult;
use super::transport::Transport;

/// Connects `transport` to the first endpoint in `endpoints` that accepts
/// the connection, trying them in order.
pub fn connect<T: Transport + ?Sized>(transport: &mut T, endpoints: &ResolverResult) -> Result<Endpoint> {
    connect_if(transport, endpoints, |_| true)
}

/// Like [`connect`], skipping candidates `predicate` rejects.
///
/// Each attempt starts from a closed transport opened with the candidate's
/// family. Fails with `not_found` when no candidate connected; an empty
/// candidate list leaves the transport untouched.
pub fn connect_if<T, P>(transport: &mut T, endpoints: &ResolverResult, mut predicate: P) -> Result<Endpoint>
where
    T: Transport + ?Sized,
    P: FnMut(&Endpoint) -> bool,
{
    if endpoints.is_empty() {
        return Err(SocketError::NotFound.into());
    }

    let base = transport.socket().protocol().unwrap_or_else(Protocol::tcp_v4);
    let mut attempted = false;

    for (attempt, endpoint) in endpoints.endpoints().enumerate() {
        if !predicate(&endpoint) {
            debug!(%endpoint, "endpoint rejected by predicate");
            continue;
        }
        attempted = true;

        close_quietly(transport);
        if let Err(e) = transport.open(base.with_family(endpoint.family())) {
            warn!(%endpoint, error = %e, "failed to open socket, trying next endpoint");
            continue;
        }

        debug!(%endpoint, attempt = attempt + 1, candidates = endpoints.len(), "connecting");
        match transport.connect(&endpoint) {
            Ok(()) => return Ok(endpoint),
            Err(e) => {
                warn!(%endpoint, error = %e, "connect failed, trying next endpoint");
            }
        }
    }

    if attempted {
        close_quietly(transport);
    }
    Err(SocketError::NotFound.into())
}

fn close_quietly<T: Transport + ?Sized>(transport: &mut T) {
    if let Err(e) = transport.close() {
        debug!(error = %e, "closing previous attempt failed");
    }
}
