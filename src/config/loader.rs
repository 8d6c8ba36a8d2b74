//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (CONSENT_SCOPES__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::RequirementsConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "consent-scopes.toml",
    ".consent-scopes.toml",
    "~/.config/consent-scopes/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<RequirementsConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let requirements: RequirementsConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&requirements)?;

    Ok(requirements)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<RequirementsConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        debug!(path, "Loading configuration file");
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                debug!(path = %expanded, "Loading configuration file");
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g. CONSENT_SCOPES__PARSER__MAX_DEPTH=32
    builder = builder.add_source(
        Environment::with_prefix("CONSENT_SCOPES")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let requirements: RequirementsConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&requirements)?;

    Ok(requirements)
}

/// Validate configuration values
fn validate_config(config: &RequirementsConfig) -> Result<(), ConfigError> {
    if config.parser.max_depth == Some(0) {
        return Err(ConfigError::Invalid {
            message: "parser.max_depth must be greater than 0".to_string(),
        });
    }

    let parser = config.scope_parser();
    for (server, server_config) in &config.resource_servers {
        if server.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "resource_servers keys must not be empty".to_string(),
            });
        }

        for scope in &server_config.scopes {
            if let Err(e) = parser.parse(scope) {
                return Err(ConfigError::InvalidScope {
                    resource_server: server.clone(),
                    scope: scope.clone(),
                    reason: format!("in resource_servers.{}.scopes: {}", server, e),
                });
            }
        }
    }

    Ok(())
}
