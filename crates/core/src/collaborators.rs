//! Collaborators a server factory must be wired with.
//!
//! [`ServerCollaborators`] is the fully-wired set: every slot is present by
//! type. When collaborators arrive piecemeal at runtime, a
//! [`CollaboratorsBuilder`] collects them and validates the whole set in one
//! pass, reporting every missing slot at once.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::errors::ConfigurationError;
use crate::metrics::MetricRegistry;
use crate::properties::VerifiableProperties;
use crate::rest::{AccessLogEntry, RestRequest, RestResponse};

/// Handles requests that reached a server
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn dispatch(&self, request: RestRequest) -> RestResponse;
}

/// Records one entry per completed request
pub trait AccessLogger: Send + Sync {
    fn log(&self, entry: &AccessLogEntry);
}

/// Answers load-balancer health checks
pub trait HealthCheckService: Send + Sync {
    /// Path that is answered by the health check instead of the dispatcher
    fn health_check_uri(&self) -> &str;

    /// Whether the service should currently receive traffic
    fn is_healthy(&self) -> bool;
}

/// Names of the collaborator slots, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collaborator {
    Properties,
    MetricRegistry,
    RequestDispatcher,
    AccessLogger,
    HealthCheckService,
}

impl Collaborator {
    /// Every slot
    pub fn all() -> Vec<Collaborator> {
        vec![
            Collaborator::Properties,
            Collaborator::MetricRegistry,
            Collaborator::RequestDispatcher,
            Collaborator::AccessLogger,
            Collaborator::HealthCheckService,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Collaborator::Properties => "properties",
            Collaborator::MetricRegistry => "metric_registry",
            Collaborator::RequestDispatcher => "request_dispatcher",
            Collaborator::AccessLogger => "access_logger",
            Collaborator::HealthCheckService => "health_check_service",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A complete set of collaborators
#[derive(Clone)]
pub struct ServerCollaborators {
    /// Raw configuration source
    pub properties: VerifiableProperties,
    /// Shared metric registry
    pub metrics: MetricRegistry,
    /// Receives inbound requests
    pub dispatcher: Arc<dyn RequestDispatcher>,
    /// Records per-request entries
    pub access_logger: Arc<dyn AccessLogger>,
    /// Answers health checks
    pub health_check: Arc<dyn HealthCheckService>,
}

impl ServerCollaborators {
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::default()
    }
}

impl fmt::Debug for ServerCollaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCollaborators")
            .field("properties", &self.properties)
            .field("metrics", &self.metrics)
            .field("health_check_uri", &self.health_check.health_check_uri())
            .finish_non_exhaustive()
    }
}

/// Collects collaborators whose presence is only known at runtime
#[derive(Default, Clone)]
pub struct CollaboratorsBuilder {
    properties: Option<VerifiableProperties>,
    metrics: Option<MetricRegistry>,
    dispatcher: Option<Arc<dyn RequestDispatcher>>,
    access_logger: Option<Arc<dyn AccessLogger>>,
    health_check: Option<Arc<dyn HealthCheckService>>,
}

impl CollaboratorsBuilder {
    pub fn properties(mut self, properties: VerifiableProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn metrics(mut self, metrics: MetricRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn RequestDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn access_logger(mut self, access_logger: Arc<dyn AccessLogger>) -> Self {
        self.access_logger = Some(access_logger);
        self
    }

    pub fn health_check(mut self, health_check: Arc<dyn HealthCheckService>) -> Self {
        self.health_check = Some(health_check);
        self
    }

    /// Validate that every slot is filled
    pub fn build(self) -> Result<ServerCollaborators, ConfigurationError> {
        let mut missing = BTreeSet::new();
        if self.properties.is_none() {
            missing.insert(Collaborator::Properties);
        }
        if self.metrics.is_none() {
            missing.insert(Collaborator::MetricRegistry);
        }
        if self.dispatcher.is_none() {
            missing.insert(Collaborator::RequestDispatcher);
        }
        if self.access_logger.is_none() {
            missing.insert(Collaborator::AccessLogger);
        }
        if self.health_check.is_none() {
            missing.insert(Collaborator::HealthCheckService);
        }

        match (
            self.properties,
            self.metrics,
            self.dispatcher,
            self.access_logger,
            self.health_check,
        ) {
            (
                Some(properties),
                Some(metrics),
                Some(dispatcher),
                Some(access_logger),
                Some(health_check),
            ) => Ok(ServerCollaborators {
                properties,
                metrics,
                dispatcher,
                access_logger,
                health_check,
            }),
            _ => Err(ConfigurationError::MissingCollaborators { missing }),
        }
    }
}
