//! Portal server bootstrap contracts
//!
//! This crate defines the seam between process bootstrap (configuration,
//! metrics, logging) and concrete transport implementations: the
//! [`ServerHandle`] and [`ServerFactory`] traits, the collaborators a factory
//! is wired with, and the fail-fast [`ConfigurationError`] raised when that
//! wiring is incomplete.

pub mod access_log;
pub mod collaborators;
pub mod dispatch;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod properties;
pub mod registry;
pub mod rest;
pub mod server;

// Re-export key types for easy access
pub use access_log::{PublicAccessLogger, ACCESS_LOG_TARGET};
pub use collaborators::{
    AccessLogger, Collaborator, CollaboratorsBuilder, HealthCheckService, RequestDispatcher,
    ServerCollaborators,
};
pub use dispatch::EchoDispatcher;
pub use errors::{ConfigurationError, InvalidProperty, ServerError};
pub use health::{VipHealthCheckService, DEFAULT_HEALTH_CHECK_URI, HEALTHY_BODY, UNHEALTHY_BODY};
pub use metrics::{IntCounter, IntGauge, MetricRegistry, MetricsSnapshot};
pub use properties::{PropertyReader, VerifiableProperties};
pub use registry::{FactoryConstructor, TransportRegistry};
pub use rest::{AccessLogEntry, RestRequest, RestResponse};
pub use server::{ServerFactory, ServerHandle};

/// Result type for bootstrap operations
pub type Result<T> = std::result::Result<T, ConfigurationError>;
