//! Network configuration types for the `memkv` server.

use std::time::Duration;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// Deadline given to every bulk update. Must stay below
    /// `request_timeout` so the batch, not the HTTP layer, reports expiry.
    pub batch_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(60),
            batch_timeout: Duration::from_secs(30),
            max_body_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.batch_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_bytes, 16_777_216);
    }

    #[test]
    fn batch_deadline_fits_inside_request_timeout() {
        let config = NetworkConfig::default();
        assert!(config.batch_timeout < config.request_timeout);
    }
}
