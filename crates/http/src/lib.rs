//! Event-loop HTTP transport
//!
//! Provides the `http` transport behind Portal's server contracts:
//! [`HttpServerFactory`] validates its configuration once and produces
//! [`HttpServer`] handles that serve requests with axum on tokio.

pub mod config;
pub mod factory;
pub mod metrics;
pub mod server;

pub use config::HttpConfig;
pub use factory::HttpServerFactory;
pub use metrics::HttpMetrics;
pub use server::HttpServer;
