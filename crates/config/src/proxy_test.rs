//! Proxy config tests

use super::*;

#[test]
fn test_defaults() {
    let config = ProxyConfig::default();
    assert_eq!(config.listen_port, 2003);
    assert_eq!(config.signer, "consul");
    assert_eq!(config.workers, 3);
    assert_eq!(config.flush_size, 5000);
    assert_eq!(config.flush_timeout, Duration::from_secs(15));
    assert_eq!(config.retry_attempts, 0);
    assert!(config.gateway.is_empty());
    assert!(config.ca_cert.is_none());
}

#[test]
fn test_full_toml() {
    let toml = r#"
gateway = "https://gw.example.com"
api_key = "k1"
signer = "api-gateway"
workers = 6
timeout = "10s"
retry_attempts = 2
client_cert = "/etc/polymur/client.pem"
client_key = "/etc/polymur/client.key"
"#;
    let config: ProxyConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.gateway, "https://gw.example.com");
    assert_eq!(config.api_key, "k1");
    assert_eq!(config.signer, "api-gateway");
    assert_eq!(config.workers, 6);
    assert_eq!(config.timeout, Duration::from_secs(10));
    assert_eq!(config.retry_attempts, 2);
    assert_eq!(
        config.client_cert,
        Some(PathBuf::from("/etc/polymur/client.pem"))
    );
}
