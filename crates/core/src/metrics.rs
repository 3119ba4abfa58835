//! Shared metric registry
//!
//! A cloneable handle onto a process-wide [`prometheus::Registry`].
//! Components wrap it in their own facade and register names under their own
//! prefix; [`MetricRegistry::render`] exports everything in the Prometheus
//! text format.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::ConfigurationError;

pub use prometheus::{IntCounter, IntGauge};

/// Point-in-time copy of every registered metric
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, i64>,
}

/// Process-wide metric registry.
///
/// Clones share the same underlying [`Registry`]. Registering a name that
/// already exists returns the metric registered first, so facades can be
/// built any number of times over one registry.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    registry: Registry,
    counters: Arc<DashMap<String, IntCounter>>,
    gauges: Arc<DashMap<String, IntGauge>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get or register a counter
    pub fn counter(&self, name: &str, help: &str) -> Result<IntCounter, ConfigurationError> {
        match self.counters.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let counter = IntCounter::new(name, help)
                    .map_err(|e| registration_error(name, e))?;
                self.registry
                    .register(Box::new(counter.clone()))
                    .map_err(|e| registration_error(name, e))?;
                Ok(entry.insert(counter).clone())
            }
        }
    }

    /// Get or register a gauge
    pub fn gauge(&self, name: &str, help: &str) -> Result<IntGauge, ConfigurationError> {
        match self.gauges.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let gauge =
                    IntGauge::new(name, help).map_err(|e| registration_error(name, e))?;
                self.registry
                    .register(Box::new(gauge.clone()))
                    .map_err(|e| registration_error(name, e))?;
                Ok(entry.insert(gauge).clone())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.counters.len() + self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|e| (e.key().clone(), e.value().get()))
                .collect(),
            gauges: self
                .gauges
                .iter()
                .map(|e| (e.key().clone(), e.value().get()))
                .collect(),
        }
    }

    /// Every gathered metric family in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("counters", &self.counters.len())
            .field("gauges", &self.gauges.len())
            .finish()
    }
}

fn registration_error(name: &str, err: prometheus::Error) -> ConfigurationError {
    ConfigurationError::MetricRegistration {
        name: name.to_string(),
        reason: err.to_string(),
    }
}
