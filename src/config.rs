//! Relay Server Configuration
//!
//! Configuration loaded from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the message relay listens on.
    pub listen_addr: SocketAddr,
    /// Path to the `username.password` credential file.
    pub users_file: PathBuf,
    /// Address for the metrics HTTP endpoint.
    pub metrics_addr: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            listen_addr: "0.0.0.0:52434".parse().unwrap(),
            users_file: PathBuf::from("./users.ul"),
            // Localhost by default; metrics contain internal info.
            metrics_addr: "127.0.0.1:52435".to_string(),
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CHATLINE_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.listen_addr = parsed;
            }
        }

        if let Ok(val) = std::env::var("CHATLINE_USERS_FILE") {
            config.users_file = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CHATLINE_METRICS_ADDR") {
            config.metrics_addr = val;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.listen_addr.port(), 52434);
        assert_eq!(config.users_file, PathBuf::from("./users.ul"));
        assert_eq!(config.metrics_addr, "127.0.0.1:52435");
    }
}
