//! Process-wide services.
//!
//! The OS socket subsystem and the TLS library are initialized at most once
//! per process and released exactly once, when the last [`Context`] that
//! acquired them is dropped. Every socket, acceptor, resolver and TLS object
//! holds a clone of the context it was created from, so the services outlive
//! all of their users.

use std::sync::{Arc, Mutex, Once, OnceLock};

use tracing::debug;

static PLATFORM_USERS: Mutex<usize> = Mutex::new(0);
static CRYPTO_PROVIDER: Once = Once::new();

/// Registration with the OS socket subsystem.
///
/// socket2 performs the Windows `WSAStartup` call on first use; this type
/// tracks how many contexts hold the subsystem so that its lifetime is tied
/// to the owning contexts rather than to module-level state.
#[derive(Debug)]
struct PlatformService(());

impl PlatformService {
    fn acquire() -> Self {
        let mut users = PLATFORM_USERS.lock().unwrap_or_else(|e| e.into_inner());
        if *users == 0 {
            debug!("socket subsystem initialized");
        }
        *users += 1;
        PlatformService(())
    }
}

impl Drop for PlatformService {
    fn drop(&mut self) {
        let mut users = PLATFORM_USERS.lock().unwrap_or_else(|e| e.into_inner());
        *users = users.saturating_sub(1);
        if *users == 0 {
            debug!("socket subsystem released");
        }
    }
}

/// The TLS library service: the process crypto provider and the default
/// client configuration built on top of it.
#[derive(Debug)]
pub struct TlsService {
    config: Arc<rustls::ClientConfig>,
}

impl TlsService {
    fn acquire(config: Option<Arc<rustls::ClientConfig>>) -> Self {
        CRYPTO_PROVIDER.call_once(|| {
            // another library may already have installed a provider
            if rustls::crypto::ring::default_provider().install_default().is_ok() {
                debug!("tls crypto provider installed");
            }
        });

        let config = config.unwrap_or_else(|| {
            let mut roots = rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Arc::new(
                rustls::ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth(),
            )
        });
        debug!("tls service started");
        TlsService { config }
    }

    /// The client configuration new TLS sessions are created from.
    pub fn client_config(&self) -> Arc<rustls::ClientConfig> {
        self.config.clone()
    }
}

impl Drop for TlsService {
    fn drop(&mut self) {
        debug!("tls service shut down");
    }
}

#[derive(Debug)]
struct Inner {
    tls: OnceLock<TlsService>,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    // declared last so it is released after the TLS service
    _platform: PlatformService,
}

/// Owning execution context for sockets and TLS sessions.
///
/// Cloning is cheap and shares the same services.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A context whose TLS sessions use `config` instead of the default
    /// client configuration.
    pub fn with_tls_config(config: Arc<rustls::ClientConfig>) -> Self {
        Self::build(Some(config))
    }

    fn build(tls_config: Option<Arc<rustls::ClientConfig>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tls: OnceLock::new(),
                tls_config,
                _platform: PlatformService::acquire(),
            }),
        }
    }

    /// The TLS service, started on first use.
    pub fn tls(&self) -> &TlsService {
        self.inner
            .tls
            .get_or_init(|| TlsService::acquire(self.inner.tls_config.clone()))
    }

    /// Whether two handles share the same services.
    pub fn same_context(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_service_is_started_once_per_context() {
        let ctx = Context::new();
        let a = ctx.tls().client_config();
        let b = ctx.clone().tls().client_config();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn platform_service_counts_live_contexts() {
        let ctx = Context::new();
        let users = *PLATFORM_USERS.lock().unwrap();
        assert!(users >= 1);
        drop(ctx);
    }
}
