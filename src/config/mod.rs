//! Configuration module
//!
//! Handles loading and validating requirement configuration from TOML files
//! and environment variables.

pub mod loader;
pub mod types;

pub use loader::{load_config, load_config_from_str};
pub use types::*;
