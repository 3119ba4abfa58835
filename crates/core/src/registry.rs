//! Transport registry
//!
//! Maps a transport name, as found in configuration, to the constructor of
//! its factory.

use std::collections::BTreeMap;
use tracing::debug;

use crate::collaborators::ServerCollaborators;
use crate::errors::ConfigurationError;
use crate::server::ServerFactory;

/// Builds a factory from a complete collaborator set
pub type FactoryConstructor =
    fn(ServerCollaborators) -> Result<Box<dyn ServerFactory>, ConfigurationError>;

/// Known transports
#[derive(Default, Clone)]
pub struct TransportRegistry {
    constructors: BTreeMap<&'static str, FactoryConstructor>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a transport
    pub fn register(&mut self, name: &'static str, constructor: FactoryConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Registered transport names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Build the factory registered as `name`
    pub fn create(
        &self,
        name: &str,
        collaborators: ServerCollaborators,
    ) -> Result<Box<dyn ServerFactory>, ConfigurationError> {
        let constructor =
            self.constructors
                .get(name)
                .ok_or_else(|| ConfigurationError::UnknownTransport {
                    name: name.to_string(),
                    available: self.names().iter().map(|n| n.to_string()).collect(),
                })?;
        debug!("Creating server factory for transport '{}'", name);
        constructor(collaborators)
    }
}
