//! Serve command implementation
//!
//! Assembles the configured transport, runs one server handle until Ctrl+C
//! or SIGTERM, then drains it.

use anyhow::{Context, Result};
use portal_core::{MetricRegistry, VerifiableProperties};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

use super::bootstrap::{assemble, load_properties};

/// Arguments for the serve command
pub struct ServeArgs {
    /// Properties file
    pub config: Option<PathBuf>,
    /// `key=value` overrides
    pub set: Vec<String>,
    /// Port override
    pub port: Option<u16>,
}

/// Execute the serve command
pub async fn execute_serve_command(args: ServeArgs) -> Result<()> {
    let properties = serve_properties(&args)?;

    // A factory that cannot be assembled aborts startup before anything binds
    let wiring = assemble(properties).context("Failed to assemble server")?;

    println!("🌐 Starting Portal server ({} transport)...", wiring.factory.transport());
    let mut server = wiring.factory.server();
    server.start().await.context("Failed to start server")?;
    wiring.health.mark_up();

    println!("✅ Server started! Press Ctrl+C to shutdown");
    wait_for_shutdown().await;

    println!("\n🛑 Shutting down server...");
    wiring.health.mark_down();
    server
        .stop()
        .await
        .context("Failed to shutdown server gracefully")?;

    print_metrics(&wiring.metrics);
    println!("✅ Server shutdown complete");
    Ok(())
}

/// Properties from the file and `--set`, with `--port` applied last
fn serve_properties(args: &ServeArgs) -> Result<VerifiableProperties> {
    let mut properties = load_properties(args.config.as_deref(), &args.set)?;
    if let Some(port) = args.port {
        properties.set(portal_http::config::PORT_KEY, port.to_string());
    }
    Ok(properties)
}

/// Print final metric values
fn print_metrics(metrics: &MetricRegistry) {
    let snapshot = metrics.snapshot();
    println!("📈 Metrics:");
    for (name, value) in &snapshot.counters {
        println!("   {}: {}", name, value);
    }
    for (name, value) in &snapshot.gauges {
        println!("   {}: {}", name, value);
    }
    info!(
        counters = snapshot.counters.len(),
        gauges = snapshot.gauges.len(),
        "Final metrics reported"
    );
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
