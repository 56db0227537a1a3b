use std::time::Duration;

use blocknet::config::{Config, CONFIG_ENV, TIMEOUT_ENV, USER_AGENT_ENV};
use blocknet::http::MAX_HEADER_BYTES;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
    assert!(cfg.user_agent.starts_with("blocknet/"));
    assert_eq!(cfg.max_header_bytes, MAX_HEADER_BYTES);
    assert!(!cfg.tls.enabled);
}

#[test]
fn test_config_partial_yaml() {
    let cfg = Config::from_yaml("timeout_secs: 5\ntls:\n  enabled: true\n").unwrap();
    assert_eq!(cfg.timeout(), Some(Duration::from_secs(5)));
    assert!(cfg.tls.enabled);
    assert_eq!(cfg.user_agent, Config::default().user_agent);

    let cfg = Config::from_yaml("timeout_secs: null\n").unwrap();
    assert_eq!(cfg.timeout(), None);

    assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
}

#[test]
fn test_config_rejects_bad_yaml() {
    assert!(Config::from_yaml("timeout_secs: soon\n").is_err());
    assert!(Config::from_yaml("max_header_bytes: [1, 2]\n").is_err());
}

#[test]
fn test_config_missing_file() {
    let err = Config::from_file(std::path::Path::new("/nonexistent/blocknet.yaml")).unwrap_err();
    assert!(err.to_string().contains("reading config file"));
}

// Every test that touches the environment lives here so they never race.
#[test]
fn test_config_layers_environment() {
    let path = std::env::temp_dir().join(format!("blocknet-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "user_agent: from-file\ntimeout_secs: 12\n").unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV, &path);
        std::env::remove_var(TIMEOUT_ENV);
        std::env::remove_var(USER_AGENT_ENV);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.user_agent, "from-file");
    assert_eq!(cfg.timeout(), Some(Duration::from_secs(12)));

    unsafe {
        std::env::set_var(TIMEOUT_ENV, "0");
        std::env::set_var(USER_AGENT_ENV, "from-env");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.user_agent, "from-env");
    assert_eq!(cfg.timeout(), None);

    unsafe {
        std::env::set_var(TIMEOUT_ENV, "later");
    }
    assert!(Config::load().is_err());

    unsafe {
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var(TIMEOUT_ENV);
        std::env::remove_var(USER_AGENT_ENV);
    }
    assert_eq!(Config::load().unwrap(), Config::default());
    let _ = std::fs::remove_file(&path);
}
