//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Outcome classes for reads against the guild state cache.
///
/// The cache is owned and mutated by the transport layer; reads here
/// can race with gateway catch-up, so a miss is not one condition but
/// three, and callers handle each differently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The entity is not in the cache yet. Expected during startup and
    /// member chunking; callers skip the fact or substitution.
    #[error("entity not yet present in state cache")]
    NotSynced,

    /// The guild is cached but the entity is gone. Mention resolution
    /// substitutes a placeholder rather than dropping the text.
    #[error("entity no longer exists")]
    Deleted,

    /// Anything else. Callers must not paper over this with
    /// possibly-wrong output.
    #[error("state lookup failed: {0}")]
    Other(String),
}
