use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::http::parser::MAX_HEADER_BYTES;

/// Names a YAML file to load settings from.
pub const CONFIG_ENV: &str = "BLOCKNET_CONFIG";
pub const TIMEOUT_ENV: &str = "BLOCKNET_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "BLOCKNET_USER_AGENT";

/// Client settings.
///
/// Sources are layered: built-in defaults, then the YAML file named by
/// `BLOCKNET_CONFIG`, then `BLOCKNET_TIMEOUT_SECS` and `BLOCKNET_USER_AGENT`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receive timeout applied to each request; none means block forever.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
    pub max_header_bytes: usize,
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Whether a request without a scheme goes over TLS.
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: Some(30),
            user_agent: format!("blocknet/{}", env!("CARGO_PKG_VERSION")),
            max_header_bytes: MAX_HEADER_BYTES,
            tls: TlsConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Missing fields keep their defaults.
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
            self.timeout_secs = (secs > 0).then_some(secs);
        }
        if let Ok(agent) = std::env::var(USER_AGENT_ENV) {
            self.user_agent = agent;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
