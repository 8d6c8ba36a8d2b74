//! Consent Scopes
//!
//! Nested OAuth scope expressions and consent-tree matching.
//!
//! ## Features
//!
//! - **Scope grammar** - parse and serialize expressions like `transfer[*data_access[read]]`
//! - **Containment** - decide whether one scope tree covers another
//! - **Consent forests** - rebuild consent trees from a flat consent list
//! - **Requirement checks** - per resource server, with the unmet scopes reported
//! - **Flexible configuration** via TOML files and environment variables
//!
//! ## Scope Model
//!
//! ```text
//! scope := ["*"] value ["[" scope (" " scope)* "]"]
//! ```
//!
//! - `*` marks a dependency as optional; a required dependency covers its optional form
//! - `[...]` lists the scopes a consent for `value` depends on
//! - Dependencies are unordered and must not revisit an ancestor
//!
//! ## Example
//!
//! ```
//! use consent_scopes::{ConsentForest, ConsentRecord};
//!
//! let forest = ConsentForest::build(vec![
//!     ConsentRecord::new(1, "client-a", "transfer", [1]),
//!     ConsentRecord::new(2, "client-b", "data_access", [1, 2]),
//! ])
//! .unwrap();
//!
//! assert!(forest.meets_scope_requirements("transfer[data_access]").unwrap());
//! assert!(!forest.meets_scope_requirements("data_access").unwrap());
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [parser]
//! max_depth = 64
//!
//! [resource_servers."transfer.api.example.org"]
//! scopes = ["transfer:all[*data_access]"]
//! ```

pub mod config;
pub mod consents;
pub mod error;
pub mod requirements;
pub mod scopes;

// Re-export main types
pub use config::{RequirementsConfig, load_config};
pub use consents::{ConsentForest, ConsentId, ConsentList, ConsentRecord, ConsentTree};
pub use error::{ConfigError, ConsentForestError, Error, Result, ScopeError};
pub use requirements::{ConsentDecision, ScopeRequirements, UnmetRequirement};
pub use scopes::{ScopeCache, ScopeNode, ScopeParser, deserialize, parse, serialize};
