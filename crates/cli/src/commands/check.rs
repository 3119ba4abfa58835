//! Check command implementation
//!
//! Builds the server factory without binding anything, so configuration
//! mistakes can be caught before a deploy.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::bootstrap::{assemble, load_properties};

/// Arguments for the check command
pub struct CheckArgs {
    /// Properties file
    pub config: Option<PathBuf>,
    /// `key=value` overrides
    pub set: Vec<String>,
}

/// Execute the check command
pub fn execute_check_command(args: CheckArgs) -> Result<()> {
    let (transport, config) = effective_config(&args)?;
    println!("✅ Configuration is valid ({} transport)", transport);
    println!("{}", config);
    Ok(())
}

/// Transport name and its effective configuration as pretty JSON
fn effective_config(args: &CheckArgs) -> Result<(&'static str, String)> {
    let properties = load_properties(args.config.as_deref(), &args.set)?;
    let wiring = assemble(properties)?;

    let config = wiring
        .factory
        .effective_config()
        .context("Failed to read the effective configuration")?;
    let json = serde_json::to_string_pretty(&config).context("Failed to render configuration")?;
    Ok((wiring.factory.transport(), json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::ConfigurationError;

    #[test]
    fn test_check_valid_overrides() {
        let args = CheckArgs {
            config: None,
            set: vec!["http.server.port=8080".to_string()],
        };
        assert!(execute_check_command(args).is_ok());
    }

    #[test]
    fn test_check_reports_factory_config() {
        let args = CheckArgs {
            config: None,
            set: vec![
                "http.server.port=8080".to_string(),
                "http.server.shutdown.timeout.ms=500".to_string(),
            ],
        };
        let (transport, json) = effective_config(&args).unwrap();
        assert_eq!(transport, "http");

        let config: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(config["port"], 8080);
        assert_eq!(config["shutdown_timeout_ms"], 500);
        assert_eq!(config["host"], "0.0.0.0");
    }

    #[test]
    fn test_check_invalid_overrides() {
        let args = CheckArgs {
            config: None,
            set: vec!["http.server.max.concurrent.requests=0".to_string()],
        };
        let err = effective_config(&args).unwrap_err();
        let config_err = err.downcast_ref::<ConfigurationError>().unwrap();
        assert_eq!(
            config_err.invalid_keys(),
            vec!["http.server.max.concurrent.requests"]
        );
        assert!(execute_check_command(args).is_err());
    }
}
