//! HTTP transport configuration
//!
//! Derived once from the raw property source when the factory is built.
//! Every malformed value is reported in the same [`ConfigurationError`].

use portal_core::{ConfigurationError, VerifiableProperties};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::warn;

/// Prefix shared by every key this module reads
pub const PREFIX: &str = "http.server.";

pub const HOST_KEY: &str = "http.server.host";
pub const PORT_KEY: &str = "http.server.port";
pub const MAX_REQUEST_BYTES_KEY: &str = "http.server.max.request.bytes";
pub const MAX_CONCURRENT_REQUESTS_KEY: &str = "http.server.max.concurrent.requests";
pub const SHUTDOWN_TIMEOUT_MS_KEY: &str = "http.server.shutdown.timeout.ms";

const DEFAULT_PORT: u16 = 1174;
const DEFAULT_MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;
const MAX_REQUEST_BYTES_LIMIT: usize = 1024 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1024;
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;

/// Configuration for the HTTP transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpConfig {
    /// Address to bind
    pub host: IpAddr,
    /// Port to bind, 0 for an ephemeral port
    pub port: u16,
    /// Largest request body accepted
    pub max_request_bytes: usize,
    /// Requests processed at once before callers queue
    pub max_concurrent_requests: usize,
    /// How long `stop` waits for in-flight requests
    pub shutdown_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl HttpConfig {
    /// Read the configuration, falling back to defaults for absent keys
    pub fn from_properties(props: &VerifiableProperties) -> Result<Self, ConfigurationError> {
        let defaults = Self::default();
        let mut reader = props.reader();

        let config = Self {
            host: reader.parsed(HOST_KEY, defaults.host),
            port: reader.int_in_range(PORT_KEY, defaults.port, 0, u16::MAX),
            max_request_bytes: reader.int_in_range(
                MAX_REQUEST_BYTES_KEY,
                defaults.max_request_bytes,
                1,
                MAX_REQUEST_BYTES_LIMIT,
            ),
            max_concurrent_requests: reader.int_in_range(
                MAX_CONCURRENT_REQUESTS_KEY,
                defaults.max_concurrent_requests,
                1,
                1_000_000,
            ),
            shutdown_timeout_ms: reader.int_in_range(
                SHUTDOWN_TIMEOUT_MS_KEY,
                defaults.shutdown_timeout_ms,
                0,
                600_000,
            ),
        };

        for key in reader.unread(PREFIX) {
            warn!("Ignoring unrecognized property {}", key);
        }
        reader.finish()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_properties() {
        let config = HttpConfig::from_properties(&VerifiableProperties::new()).unwrap();
        assert_eq!(config, HttpConfig::default());
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:1174");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let props: VerifiableProperties = [
            (HOST_KEY, "127.0.0.1"),
            (PORT_KEY, "0"),
            (MAX_REQUEST_BYTES_KEY, "4096"),
            (MAX_CONCURRENT_REQUESTS_KEY, "8"),
            (SHUTDOWN_TIMEOUT_MS_KEY, "250"),
        ]
        .into_iter()
        .collect();

        let config = HttpConfig::from_properties(&props).unwrap();
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:0");
        assert_eq!(config.max_request_bytes, 4096);
        assert_eq!(config.max_concurrent_requests, 8);
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_every_invalid_value_reported() {
        let props: VerifiableProperties = [
            (HOST_KEY, "not-an-ip"),
            (PORT_KEY, "70000"),
            (MAX_CONCURRENT_REQUESTS_KEY, "0"),
            (SHUTDOWN_TIMEOUT_MS_KEY, "250"),
        ]
        .into_iter()
        .collect();

        let err = HttpConfig::from_properties(&props).unwrap_err();
        assert_eq!(
            err.invalid_keys(),
            vec![HOST_KEY, PORT_KEY, MAX_CONCURRENT_REQUESTS_KEY]
        );
        assert!(err.to_string().contains("[http.server.port=70000]"));
    }

    #[test]
    fn test_serializes_effective_config() {
        let json = serde_json::to_value(HttpConfig::default()).unwrap();
        assert_eq!(json["host"], "0.0.0.0");
        assert_eq!(json["port"], 1174);
        assert_eq!(json["shutdown_timeout_ms"], 30_000);
    }

    #[test]
    fn test_unknown_keys_are_not_errors() {
        let props: VerifiableProperties = [("http.server.prot", "80")].into_iter().collect();
        assert!(HttpConfig::from_properties(&props).is_ok());
    }
}
