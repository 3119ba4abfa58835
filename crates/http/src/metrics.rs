//! HTTP transport metrics facade

use portal_core::{ConfigurationError, IntCounter, IntGauge, MetricRegistry};

pub const REQUESTS: &str = "http_server_requests_total";
pub const RESPONSES_2XX: &str = "http_server_responses_2xx_total";
pub const RESPONSES_4XX: &str = "http_server_responses_4xx_total";
pub const RESPONSES_5XX: &str = "http_server_responses_5xx_total";
pub const RESPONSES_OTHER: &str = "http_server_responses_other_total";
pub const HEALTH_CHECKS: &str = "http_server_health_checks_total";
pub const REQUEST_TOO_LARGE: &str = "http_server_request_too_large_total";
pub const ACTIVE_REQUESTS: &str = "http_server_active_requests";
pub const STARTS: &str = "http_server_starts_total";
pub const STOPS: &str = "http_server_stops_total";

/// Metrics registered by HTTP servers under the `http_server_` prefix.
///
/// Every server built by one factory shares the same facade.
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub requests: IntCounter,
    pub responses_2xx: IntCounter,
    pub responses_4xx: IntCounter,
    pub responses_5xx: IntCounter,
    pub responses_other: IntCounter,
    pub health_checks: IntCounter,
    pub request_too_large: IntCounter,
    pub active_requests: IntGauge,
    pub starts: IntCounter,
    pub stops: IntCounter,
}

impl HttpMetrics {
    pub fn new(registry: &MetricRegistry) -> Result<Self, ConfigurationError> {
        Ok(Self {
            requests: registry.counter(REQUESTS, "HTTP requests received")?,
            responses_2xx: registry.counter(RESPONSES_2XX, "HTTP responses with a 2xx status")?,
            responses_4xx: registry.counter(RESPONSES_4XX, "HTTP responses with a 4xx status")?,
            responses_5xx: registry.counter(RESPONSES_5XX, "HTTP responses with a 5xx status")?,
            responses_other: registry
                .counter(RESPONSES_OTHER, "HTTP responses with any other status")?,
            health_checks: registry.counter(HEALTH_CHECKS, "Health check requests answered")?,
            request_too_large: registry
                .counter(REQUEST_TOO_LARGE, "Requests rejected for an oversized body")?,
            active_requests: registry.gauge(ACTIVE_REQUESTS, "HTTP requests in flight")?,
            starts: registry.counter(STARTS, "HTTP server starts")?,
            stops: registry.counter(STOPS, "HTTP server stops")?,
        })
    }

    /// Count a response by status class
    pub fn record_status(&self, status: u16) {
        match status {
            200..=299 => self.responses_2xx.inc(),
            400..=499 => self.responses_4xx.inc(),
            500..=599 => self.responses_5xx.inc(),
            _ => self.responses_other.inc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        let registry = MetricRegistry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        metrics.record_status(200);
        metrics.record_status(204);
        metrics.record_status(413);
        metrics.record_status(503);
        metrics.record_status(302);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.counters[RESPONSES_2XX], 2);
        assert_eq!(snapshot.counters[RESPONSES_4XX], 1);
        assert_eq!(snapshot.counters[RESPONSES_5XX], 1);
        assert_eq!(snapshot.counters[RESPONSES_OTHER], 1);
    }

    #[test]
    fn test_facades_share_registry() {
        let registry = MetricRegistry::new();
        let first = HttpMetrics::new(&registry).unwrap();
        let second = HttpMetrics::new(&registry).unwrap();

        first.requests.inc();
        second.requests.inc();
        assert_eq!(registry.snapshot().counters[REQUESTS], 2);
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.registry().gather().len(), 10);
    }

    #[test]
    fn test_exported_under_prefix() {
        let registry = MetricRegistry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();
        metrics.active_requests.inc();

        let text = registry.render().unwrap();
        assert!(text.contains("# TYPE http_server_active_requests gauge"));
        assert!(text.contains("http_server_active_requests 1"));
        assert!(text.contains("http_server_requests_total 0"));
    }

    #[test]
    fn test_conflicting_registration_fails() {
        let registry = MetricRegistry::new();
        registry.gauge(REQUESTS, "Registered elsewhere as a gauge").unwrap();

        let err = HttpMetrics::new(&registry).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MetricRegistration { ref name, .. } if name == REQUESTS
        ));
    }
}
