//! Configuration management
//!
//! A single TOML document with `[log]`, `[relay]`, `[icmp]`, `[tcp]` and
//! `[ip]` tables. Every field has a default, so an empty file is a valid
//! configuration.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    from_str(&content)
}

/// Parse configuration from TOML text
pub fn from_str(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Validate `config`, log every diagnostic, and reject it on any error
pub fn check(config: Config) -> Result<Config> {
    let result = validate(&config);
    result.log_diagnostics();
    if result.has_errors() {
        return Err(Error::Config(result.errors.join("; ")));
    }
    Ok(config)
}

/// [`load`] followed by [`check`]
pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Config> {
    check(load(path)?)
}
