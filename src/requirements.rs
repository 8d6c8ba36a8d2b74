//! Per resource server scope requirements
//!
//! Before starting a flow, the caller collects the scopes each resource
//! server needs and asks whether the identity's consents already cover
//! them. Servers whose scopes are not covered are reported individually so
//! the caller can request consent for just those.

use crate::config::RequirementsConfig;
use crate::consents::ConsentForest;
use crate::error::{ConfigError, ScopeResult};
use crate::scopes::{IntoScopes, ScopeNode};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, trace, warn};

/// Required scopes keyed by resource server, in server name order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeRequirements {
    servers: BTreeMap<String, Vec<ScopeNode>>,
}

/// A required scope that no consent tree covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetRequirement {
    pub resource_server: String,
    pub scope: ScopeNode,
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource_server, self.scope)
    }
}

/// Outcome of checking a requirement set against a consent forest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentDecision {
    /// Every required scope is met
    Satisfied,
    /// Consent must be requested for these scopes
    Unmet(Vec<UnmetRequirement>),
}

impl ConsentDecision {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ConsentDecision::Satisfied)
    }

    pub fn unmet(&self) -> &[UnmetRequirement] {
        match self {
            ConsentDecision::Satisfied => &[],
            ConsentDecision::Unmet(unmet) => unmet,
        }
    }
}

impl ScopeRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build requirements from the `[resource_servers]` configuration
    ///
    /// Scope strings are parsed with the configured parser.
    pub fn from_config(config: &RequirementsConfig) -> Result<Self, ConfigError> {
        let parser = config.scope_parser();
        let mut requirements = Self::new();

        for (server, server_config) in &config.resource_servers {
            let entry = requirements.servers.entry(server.clone()).or_default();
            for scope in &server_config.scopes {
                let parsed = parser
                    .parse(scope)
                    .map_err(|e| ConfigError::InvalidScope {
                        resource_server: server.clone(),
                        scope: scope.clone(),
                        reason: e.to_string(),
                    })?;
                entry.extend(parsed);
            }
        }

        debug!(
            servers = requirements.servers.len(),
            "Loaded scope requirements from configuration"
        );
        Ok(requirements)
    }

    /// Append `scopes` to the requirements of `server`
    pub fn insert<R: IntoScopes>(
        &mut self,
        server: impl Into<String>,
        scopes: R,
    ) -> ScopeResult<()> {
        let scopes = scopes.into_scopes()?;
        self.servers.entry(server.into()).or_default().extend(scopes);
        Ok(())
    }

    /// Parse `scope` and append it to the requirements of `server`
    pub fn add_scope(&mut self, server: impl Into<String>, scope: &str) -> ScopeResult<()> {
        self.insert(server, scope)
    }

    pub fn get(&self, server: &str) -> Option<&[ScopeNode]> {
        self.servers.get(server).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ScopeNode])> + '_ {
        self.servers
            .iter()
            .map(|(server, scopes)| (server.as_str(), scopes.as_slice()))
    }

    pub fn resource_servers(&self) -> impl Iterator<Item = &str> + '_ {
        self.servers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Check every server's scopes against `forest`
    pub fn check(&self, forest: &ConsentForest) -> ConsentDecision {
        debug!(
            servers = self.servers.len(),
            trees = forest.len(),
            "Checking scope requirements"
        );

        let mut unmet = Vec::new();
        for (server, scopes) in &self.servers {
            for scope in scopes {
                if forest.meets_scope_requirement(scope) {
                    trace!(resource_server = %server, scope = %scope, "Requirement met");
                } else {
                    unmet.push(UnmetRequirement {
                        resource_server: server.clone(),
                        scope: scope.clone(),
                    });
                }
            }
        }

        if unmet.is_empty() {
            ConsentDecision::Satisfied
        } else {
            warn!(
                unmet = unmet.len(),
                servers = ?unmet
                    .iter()
                    .map(|u| u.resource_server.as_str())
                    .collect::<BTreeSet<_>>(),
                "Scope requirements not met by existing consents"
            );
            ConsentDecision::Unmet(unmet)
        }
    }

    /// Are the scopes of `server` met? `None` for an unknown server.
    pub fn check_server(&self, server: &str, forest: &ConsentForest) -> Option<bool> {
        self.servers.get(server).map(|scopes| {
            scopes
                .iter()
                .all(|scope| forest.meets_scope_requirement(scope))
        })
    }
}
