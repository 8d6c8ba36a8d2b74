//! Scope expressions
//!
//! Parsing, serialization, and the containment relation for nested scope
//! expressions such as `transfer:all[*data_access https://auth.example.org/scopes/read]`.
//!
//! ## Syntax
//!
//! - Scopes are separated by whitespace
//! - `[...]` directly after a scope lists the scopes it depends on
//! - `*` directly before a scope marks it optional
//!
//! ```
//! use consent_scopes::scopes::{ScopeNode, parse};
//!
//! let granted: ScopeNode = "transfer[data_access[read]]".parse().unwrap();
//! let needed = parse("transfer[*data_access] transfer").unwrap();
//! assert!(needed.iter().all(|scope| granted.satisfies(scope)));
//! ```

pub mod cache;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod requirement;

pub use cache::{CacheStats, ScopeCache};
pub use node::ScopeNode;
pub use parser::{ScopeParser, deserialize, parse, scopes_to_string, serialize};
pub use requirement::IntoScopes;
