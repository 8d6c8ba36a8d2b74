//! Error types for consent-scopes
//!
//! This module defines the error hierarchy used throughout the crate.
//! Every error here is a permanent rejection of the input that produced it:
//! nothing in the crate performs I/O on the decision path, so there is no
//! transient failure to retry.

use crate::consents::ConsentId;
use thiserror::Error;

/// Top-level crate error
#[derive(Error, Debug)]
pub enum Error {
    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    #[error("Consent forest error: {0}")]
    Consent(#[from] ConsentForestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What went wrong while parsing a scope expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// `*` at the end of the input or directly after a scope token
    DanglingOptional,
    /// `*` followed by something other than a scope token
    OptionalNotAdjacent,
    /// `[]` or a bracket pair holding only whitespace
    EmptyBrackets,
    /// `[` that does not directly follow a scope token
    UnattachedBracket,
    /// Two terms that are not separated by whitespace
    MissingSeparator,
    /// Whitespace between a scope token and its `[`
    SpaceBeforeBracket,
    /// `[` that is never closed
    UnclosedBracket,
    /// `]` without a matching `[`
    UnopenedBracket,
    /// Scope value containing reserved characters, or empty
    InvalidToken,
    /// Nesting deeper than the parser's configured limit
    TooDeep,
}

impl ParseErrorKind {
    pub fn description(&self) -> &'static str {
        match self {
            ParseErrorKind::DanglingOptional => "optional marker '*' is not followed by a scope",
            ParseErrorKind::OptionalNotAdjacent => {
                "optional marker '*' must be directly followed by a scope"
            }
            ParseErrorKind::EmptyBrackets => "dependency brackets must not be empty",
            ParseErrorKind::UnattachedBracket => "'[' must directly follow a scope",
            ParseErrorKind::MissingSeparator => "scopes must be separated by whitespace",
            ParseErrorKind::SpaceBeforeBracket => "whitespace is not allowed before '['",
            ParseErrorKind::UnclosedBracket => "'[' is never closed",
            ParseErrorKind::UnopenedBracket => "']' has no matching '['",
            ParseErrorKind::InvalidToken => "scope contains reserved characters or is empty",
            ParseErrorKind::TooDeep => "dependency nesting exceeds the configured limit",
        }
    }
}

/// Malformed scope expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} at position {position} in '{input}'", .kind.description())]
pub struct ScopeParseError {
    /// Byte offset of the offending character
    pub position: usize,
    pub kind: ParseErrorKind,
    /// The full input, so the offending substring can be located
    pub input: String,
}

impl ScopeParseError {
    pub fn new(kind: ParseErrorKind, position: usize, input: impl Into<String>) -> Self {
        Self {
            position,
            kind,
            input: input.into(),
        }
    }
}

/// A dependency chain that revisits one of its ancestors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Scope dependency cycle on '{value}': {}", .path.join(" -> "))]
pub struct ScopeCycleError {
    /// The repeated scope value
    pub value: String,
    /// Ancestor chain from the outermost scope down to the repeat
    pub path: Vec<String>,
}

/// Errors produced by scope parsing and construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Scope parse error: {0}")]
    Parse(#[from] ScopeParseError),

    #[error("{0}")]
    Cycle(#[from] ScopeCycleError),

    #[error("Invalid scope usage: {0}")]
    Usage(String),
}

impl ScopeError {
    pub fn is_cycle(&self) -> bool {
        matches!(self, ScopeError::Cycle(_))
    }

    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            ScopeError::Parse(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Errors raised while reconstructing consent trees
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsentForestError {
    #[error("Consent {consent} references parent {parent}, which is not in the consent list")]
    MissingParent {
        consent: ConsentId,
        parent: ConsentId,
    },

    #[error("Consent {consent} has an invalid dependency path: {reason}")]
    InvalidDependencyPath { consent: ConsentId, reason: String },

    #[error("Consent {0} appears more than once")]
    DuplicateConsent(ConsentId),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Invalid scope '{scope}' for resource server '{resource_server}': {reason}")]
    InvalidScope {
        resource_server: String,
        scope: String,
        reason: String,
    },
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for scope operations
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;
