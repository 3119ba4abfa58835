//! HTTP implementation of [`ServerFactory`].
//!
//! Derives the [`HttpConfig`] and the [`HttpMetrics`] facade once, at
//! construction, so that producing a server can never fail.

use portal_core::{
    AccessLogger, CollaboratorsBuilder, ConfigurationError, HealthCheckService,
    RequestDispatcher, ServerCollaborators, ServerFactory, ServerHandle, TransportRegistry,
};
use std::sync::Arc;
use tracing::trace;

use crate::config::HttpConfig;
use crate::metrics::HttpMetrics;
use crate::server::HttpServer;

/// Builds [`HttpServer`]s wired to one set of collaborators
pub struct HttpServerFactory {
    config: HttpConfig,
    metrics: HttpMetrics,
    dispatcher: Arc<dyn RequestDispatcher>,
    access_logger: Arc<dyn AccessLogger>,
    health_check: Arc<dyn HealthCheckService>,
}

impl HttpServerFactory {
    /// Name this transport is registered under
    pub const TRANSPORT: &'static str = "http";

    /// Create a factory from a complete collaborator set.
    ///
    /// Fails if the properties hold any invalid HTTP setting, with every
    /// invalid key listed in the error, or if the metric registry already
    /// holds a conflicting metric.
    pub fn new(collaborators: ServerCollaborators) -> Result<Self, ConfigurationError> {
        let config = HttpConfig::from_properties(&collaborators.properties)?;
        let metrics = HttpMetrics::new(&collaborators.metrics)?;
        trace!("Instantiated HttpServerFactory");
        Ok(Self {
            config,
            metrics,
            dispatcher: collaborators.dispatcher,
            access_logger: collaborators.access_logger,
            health_check: collaborators.health_check,
        })
    }

    /// Create a factory from collaborators gathered at runtime.
    ///
    /// Every missing collaborator is reported at once.
    pub fn from_builder(builder: CollaboratorsBuilder) -> Result<Self, ConfigurationError> {
        Self::new(builder.build()?)
    }

    /// Register this transport
    pub fn register(registry: &mut TransportRegistry) {
        registry.register(Self::TRANSPORT, construct);
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// A new, stopped HTTP server
    pub fn http_server(&self) -> HttpServer {
        HttpServer::new(
            self.config.clone(),
            self.metrics.clone(),
            self.dispatcher.clone(),
            self.access_logger.clone(),
            self.health_check.clone(),
        )
    }
}

impl ServerFactory for HttpServerFactory {
    fn transport(&self) -> &'static str {
        Self::TRANSPORT
    }

    fn server(&self) -> Box<dyn ServerHandle> {
        Box::new(self.http_server())
    }

    fn effective_config(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.config)
    }
}

fn construct(
    collaborators: ServerCollaborators,
) -> Result<Box<dyn ServerFactory>, ConfigurationError> {
    Ok(Box::new(HttpServerFactory::new(collaborators)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HOST_KEY, PORT_KEY};
    use portal_core::{
        Collaborator, EchoDispatcher, MetricRegistry, PublicAccessLogger, VerifiableProperties,
        VipHealthCheckService,
    };

    /// Builder with every slot filled except `skip`
    fn builder_without(skip: &[Collaborator]) -> CollaboratorsBuilder {
        let mut builder = CollaboratorsBuilder::default();
        if !skip.contains(&Collaborator::Properties) {
            builder = builder.properties(VerifiableProperties::new());
        }
        if !skip.contains(&Collaborator::MetricRegistry) {
            builder = builder.metrics(MetricRegistry::new());
        }
        if !skip.contains(&Collaborator::RequestDispatcher) {
            builder = builder.dispatcher(Arc::new(EchoDispatcher));
        }
        if !skip.contains(&Collaborator::AccessLogger) {
            builder = builder.access_logger(Arc::new(PublicAccessLogger::default()));
        }
        if !skip.contains(&Collaborator::HealthCheckService) {
            builder = builder.health_check(Arc::new(VipHealthCheckService::new(
                "/portal-frontend/admin",
            )));
        }
        builder
    }

    fn local_factory() -> HttpServerFactory {
        let props: VerifiableProperties =
            [(HOST_KEY, "127.0.0.1"), (PORT_KEY, "0")].into_iter().collect();
        HttpServerFactory::from_builder(builder_without(&[]).properties(props)).unwrap()
    }

    #[test]
    fn test_each_missing_collaborator_is_named() {
        for slot in Collaborator::all() {
            let err = match HttpServerFactory::from_builder(builder_without(&[slot])) {
                Err(err) => err,
                Ok(_) => panic!("factory built without {}", slot),
            };
            assert_eq!(err.missing(), vec![slot]);

            let message = err.to_string();
            for other in Collaborator::all() {
                assert_eq!(
                    message.contains(other.name()),
                    other == slot,
                    "{} in '{}'",
                    other,
                    message
                );
            }
        }
    }

    #[test]
    fn test_all_missing_collaborators_are_named() {
        let err = match HttpServerFactory::from_builder(builder_without(&Collaborator::all())) {
            Err(err) => err,
            Ok(_) => panic!("factory built without collaborators"),
        };
        assert_eq!(err.missing(), Collaborator::all());
        assert_eq!(
            err.to_string(),
            "Missing collaborator(s) during server factory construction - [properties] \
             [metric_registry] [request_dispatcher] [access_logger] [health_check_service]"
        );
    }

    #[test]
    fn test_defaults_only_properties_build() {
        let factory = HttpServerFactory::from_builder(builder_without(&[])).unwrap();
        assert_eq!(factory.config(), &HttpConfig::default());
        assert_eq!(factory.transport(), HttpServerFactory::TRANSPORT);
    }

    #[test]
    fn test_invalid_properties_fail_construction() {
        let props: VerifiableProperties =
            [(PORT_KEY, "-1"), (HOST_KEY, "localhost:80")].into_iter().collect();
        let err = match HttpServerFactory::from_builder(builder_without(&[]).properties(props)) {
            Err(err) => err,
            Ok(_) => panic!("factory built with invalid properties"),
        };
        assert_eq!(err.invalid_keys(), vec![HOST_KEY, PORT_KEY]);
        assert!(err.missing().is_empty());
    }

    #[test]
    fn test_server_is_an_http_server() {
        let factory = local_factory();
        let server = factory.server();
        let http = server
            .as_any()
            .downcast_ref::<HttpServer>()
            .expect("factory should build HttpServer");
        assert!(!http.is_running());
        assert_eq!(http.config(), factory.config());
    }

    #[tokio::test]
    async fn test_servers_are_distinct() {
        let factory = local_factory();
        let mut first = factory.server();
        let mut second = factory.server();
        let first_ptr: *const dyn ServerHandle = &*first;
        let second_ptr: *const dyn ServerHandle = &*second;
        assert!(!std::ptr::addr_eq(first_ptr, second_ptr));

        first.start().await.unwrap();
        second.start().await.unwrap();

        let first_addr = first.as_any().downcast_ref::<HttpServer>().unwrap().local_addr();
        let second_addr = second.as_any().downcast_ref::<HttpServer>().unwrap().local_addr();
        assert!(first_addr.is_some());
        assert_ne!(first_addr, second_addr);

        first.stop().await.unwrap();
        assert!(second.as_any().downcast_ref::<HttpServer>().unwrap().is_running());
        second.stop().await.unwrap();
    }

    #[test]
    fn test_repeated_construction_is_deterministic() {
        let metrics = MetricRegistry::new();
        let build = || {
            HttpServerFactory::from_builder(builder_without(&[]).metrics(metrics.clone())).unwrap()
        };

        let first = build();
        let registered = metrics.len();
        let second = build();

        assert_eq!(first.config(), second.config());
        assert_eq!(metrics.len(), registered);
        assert_eq!(metrics.registry().gather().len(), registered);
    }

    #[test]
    fn test_effective_config_reflects_properties() {
        let factory = local_factory();
        let config = factory.effective_config().unwrap();
        assert_eq!(config["host"], "127.0.0.1");
        assert_eq!(config["port"], 0);
        assert_eq!(config["max_concurrent_requests"], 1024);
    }

    #[test]
    fn test_factory_is_shareable_across_threads() {
        let factory = Arc::new(local_factory());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let factory = factory.clone();
                std::thread::spawn(move || factory.server().as_any().is::<HttpServer>())
            })
            .collect();

        for worker in workers {
            assert!(worker.join().unwrap());
        }
    }

    #[test]
    fn test_registered_in_registry() {
        let mut registry = TransportRegistry::new();
        HttpServerFactory::register(&mut registry);
        assert_eq!(registry.names(), vec![HttpServerFactory::TRANSPORT]);

        let collaborators = builder_without(&[]).build().unwrap();
        let factory = registry.create("http", collaborators).unwrap();
        assert!(factory.server().as_any().is::<HttpServer>());
    }
}
