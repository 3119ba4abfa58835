//! Server handle and factory contracts
//!
//! Callers program against [`ServerFactory`] and [`ServerHandle`] only. Each
//! transport provides one concrete factory and one concrete handle; the
//! factory's [`server`](ServerFactory::server) is the only place the concrete
//! handle is built.

use async_trait::async_trait;
use std::any::Any;

use crate::errors::ServerError;

/// A server that can be started and stopped.
///
/// Implementations own their transport resources (sockets, event loop).
#[async_trait]
pub trait ServerHandle: Send + Sync {
    /// Bind and begin serving
    async fn start(&mut self) -> Result<(), ServerError>;

    /// Stop serving and release transport resources
    async fn stop(&mut self) -> Result<(), ServerError>;

    /// Concrete handle, for callers that need to check the transport type
    fn as_any(&self) -> &dyn Any;
}

/// Produces server handles bound to an already-validated set of collaborators.
///
/// A factory is immutable once built, so `server` never fails and may be
/// called from several threads.
pub trait ServerFactory: Send + Sync {
    /// Registry name of the transport this factory builds
    fn transport(&self) -> &'static str;

    /// A new, independent handle sharing this factory's collaborators
    fn server(&self) -> Box<dyn ServerHandle>;

    /// The settings this factory derived from its properties, defaults
    /// included
    fn effective_config(&self) -> serde_json::Result<serde_json::Value>;
}
