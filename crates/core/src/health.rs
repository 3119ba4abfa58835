//! VIP health check service
//!
//! Tracks whether this process should receive traffic from a load balancer.
//! The service starts down; bootstrap marks it up once the server is serving.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::collaborators::HealthCheckService;

/// Default path polled by load balancers
pub const DEFAULT_HEALTH_CHECK_URI: &str = "/healthCheck";

/// Body returned while the service is up
pub const HEALTHY_BODY: &str = "GOOD";

/// Body returned while the service is down
pub const UNHEALTHY_BODY: &str = "BAD";

#[derive(Debug)]
pub struct VipHealthCheckService {
    uri: String,
    up: AtomicBool,
}

impl VipHealthCheckService {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            up: AtomicBool::new(false),
        }
    }

    pub fn mark_up(&self) {
        if !self.up.swap(true, Ordering::SeqCst) {
            info!("Health check {} now reporting {}", self.uri, HEALTHY_BODY);
        }
    }

    pub fn mark_down(&self) {
        if self.up.swap(false, Ordering::SeqCst) {
            info!("Health check {} now reporting {}", self.uri, UNHEALTHY_BODY);
        }
    }
}

impl Default for VipHealthCheckService {
    fn default() -> Self {
        Self::new(DEFAULT_HEALTH_CHECK_URI)
    }
}

impl HealthCheckService for VipHealthCheckService {
    fn health_check_uri(&self) -> &str {
        &self.uri
    }

    fn is_healthy(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}
