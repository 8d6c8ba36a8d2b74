//! Configuration types for consent-scopes
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::scopes::ScopeParser;
use serde::Deserialize;
use std::collections::HashMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequirementsConfig {
    /// Scope parser settings
    pub parser: ParserConfig,

    /// Required scopes per resource server, keyed by server name
    pub resource_servers: HashMap<String, ResourceServerConfig>,
}

impl RequirementsConfig {
    /// Parser configured by the `[parser]` section
    pub fn scope_parser(&self) -> ScopeParser {
        self.parser.build()
    }
}

/// Scope parser configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum dependency nesting, unbounded when unset
    pub max_depth: Option<usize>,
}

impl ParserConfig {
    pub fn build(&self) -> ScopeParser {
        match self.max_depth {
            Some(depth) => ScopeParser::with_max_depth(depth),
            None => ScopeParser::new(),
        }
    }
}

/// Requirements of a single resource server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourceServerConfig {
    /// Scope expressions, each possibly holding several top-level scopes
    pub scopes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RequirementsConfig::default();
        assert!(config.parser.max_depth.is_none());
        assert!(config.resource_servers.is_empty());
        assert_eq!(config.scope_parser().max_depth(), None);
    }

    #[test]
    fn test_parser_config_builds_bounded_parser() {
        let parser = ParserConfig { max_depth: Some(4) }.build();
        assert_eq!(parser.max_depth(), Some(4));
    }
}
