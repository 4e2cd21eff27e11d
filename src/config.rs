use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Listeners
    pub http_listen_addr: String,
    pub grpc_listen_addr: String,

    // Geodata
    pub geoip_path: String,

    // Shutdown
    pub drain_timeout_secs: u64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_listen_addr: "0.0.0.0:8080".to_string(),
            grpc_listen_addr: "0.0.0.0:50051".to_string(),
            geoip_path: "./GeoLite2-Country.mmdb".to_string(),
            drain_timeout_secs: 10,
            debug: false,
        }
    }
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, addr) in [
            ("http_listen_addr", &self.http_listen_addr),
            ("grpc_listen_addr", &self.grpc_listen_addr),
        ] {
            if addr.parse::<SocketAddr>().is_err() {
                return Err(ConfigError::InvalidListenAddr {
                    name,
                    value: addr.clone(),
                });
            }
        }
        if self.http_listen_addr == self.grpc_listen_addr {
            return Err(ConfigError::SharedListenAddr(self.http_listen_addr.clone()));
        }
        if self.geoip_path.is_empty() {
            return Err(ConfigError::MissingGeoipPath);
        }
        if self.drain_timeout_secs == 0 {
            return Err(ConfigError::ZeroDrainTimeout);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {value:?}")]
    InvalidListenAddr { name: &'static str, value: String },
    #[error("HTTP and gRPC cannot share listen address {0}")]
    SharedListenAddr(String),
    #[error("geoip_path is required")]
    MissingGeoipPath,
    #[error("drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,
}

pub fn load_config() -> anyhow::Result<Config> {
    Ok(load_config_from(|key| std::env::var(key).ok()))
}

/// Build a config from an arbitrary variable source.
///
/// `IPCHECKER_*` variables take precedence; `HTTP_PORT` and
/// `MAXMIND_DB_PATH` are accepted as fallbacks.
pub fn load_config_from(var: impl Fn(&str) -> Option<String>) -> Config {
    let defaults = Config::default();

    let http_listen_addr = var("IPCHECKER_HTTP_LISTEN_ADDR")
        .or_else(|| var("HTTP_PORT").map(|port| format!("0.0.0.0:{}", port)))
        .unwrap_or(defaults.http_listen_addr);

    let grpc_listen_addr =
        var("IPCHECKER_GRPC_LISTEN_ADDR").unwrap_or(defaults.grpc_listen_addr);

    let geoip_path = var("IPCHECKER_GEOIP_PATH")
        .or_else(|| var("MAXMIND_DB_PATH"))
        .unwrap_or(defaults.geoip_path);

    let drain_timeout_secs = var("IPCHECKER_DRAIN_TIMEOUT_SECS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.drain_timeout_secs);

    let debug = var("DEBUG").is_some();

    Config {
        http_listen_addr,
        grpc_listen_addr,
        geoip_path,
        drain_timeout_secs,
        debug,
    }
}
