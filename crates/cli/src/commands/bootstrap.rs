//! Process bootstrap
//!
//! Turns a property source into a validated server factory: reads the
//! settings owned by the CLI, builds the stock collaborators, and asks the
//! transport registry for the configured factory.

use anyhow::{Context, Result};
use portal_core::{
    EchoDispatcher, MetricRegistry, PublicAccessLogger, ServerCollaborators, ServerFactory,
    TransportRegistry, VerifiableProperties, VipHealthCheckService, DEFAULT_HEALTH_CHECK_URI,
};
use portal_http::HttpServerFactory;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const TRANSPORT_KEY: &str = "portal.server.transport";
pub const HEALTH_CHECK_URI_KEY: &str = "portal.health.check.uri";
pub const ACCESS_LOG_REQUEST_HEADERS_KEY: &str = "portal.access.log.request.headers";
pub const ACCESS_LOG_RESPONSE_HEADERS_KEY: &str = "portal.access.log.response.headers";

/// Everything `serve` needs after a successful bootstrap
pub struct Wiring {
    /// Shared metric registry
    pub metrics: MetricRegistry,
    /// Health check service, down until the server is serving
    pub health: Arc<VipHealthCheckService>,
    /// Factory for the configured transport
    pub factory: Box<dyn ServerFactory>,
}

/// Every transport this binary can run
pub fn transport_registry() -> TransportRegistry {
    let mut registry = TransportRegistry::new();
    HttpServerFactory::register(&mut registry);
    registry
}

/// Load properties from an optional file, then apply `key=value` overrides
pub fn load_properties(
    config: Option<&Path>,
    overrides: &[String],
) -> Result<VerifiableProperties> {
    let mut properties = match config {
        Some(path) => VerifiableProperties::load(path)
            .with_context(|| format!("Failed to read properties file: {}", path.display()))?,
        None => VerifiableProperties::new(),
    };

    for entry in overrides {
        let (key, value) = parse_override(entry)?;
        properties.set(key, value);
    }
    Ok(properties)
}

/// Parse a `key=value` override with a helpful error message
pub fn parse_override(entry: &str) -> Result<(String, String)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => anyhow::bail!(
            "Invalid property override '{}'. \
             Expected format: key=value (e.g., http.server.port=8080)",
            entry
        ),
    }
}

/// Build the collaborators and the configured transport's factory.
///
/// Fails before anything is bound if any collaborator or setting is invalid.
pub fn assemble(properties: VerifiableProperties) -> Result<Wiring> {
    let mut reader = properties.reader();
    let transport = reader.string(TRANSPORT_KEY, HttpServerFactory::TRANSPORT);
    let health_check_uri = reader.string(HEALTH_CHECK_URI_KEY, DEFAULT_HEALTH_CHECK_URI);
    let request_headers = reader.list(ACCESS_LOG_REQUEST_HEADERS_KEY);
    let response_headers = reader.list(ACCESS_LOG_RESPONSE_HEADERS_KEY);
    reader.finish()?;

    let metrics = MetricRegistry::new();
    let health = Arc::new(VipHealthCheckService::new(health_check_uri));
    let collaborators = ServerCollaborators::builder()
        .properties(properties)
        .metrics(metrics.clone())
        .dispatcher(Arc::new(EchoDispatcher))
        .access_logger(Arc::new(PublicAccessLogger::new(request_headers, response_headers)))
        .health_check(health.clone())
        .build()?;

    let factory = transport_registry()
        .create(&transport, collaborators)
        .with_context(|| format!("Failed to create '{}' server factory", transport))?;
    info!("Assembled '{}' server factory", factory.transport());

    Ok(Wiring {
        metrics,
        health,
        factory,
    })
}
