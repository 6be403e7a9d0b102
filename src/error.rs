//! Error types for the Turnstile engine.

use thiserror::Error;

/// Main error type for Turnstile operations.
///
/// An admission rejection is not an error. Rejected requests are reported
/// through the decision returned by a check, with `allowed` set to false.
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// A check named a policy that is not in the table. This is a wiring
    /// mistake in the embedding service, surfaced at the call site, not
    /// something a runtime caller should retry.
    #[error("Unknown admission policy: {0}")]
    UnknownPolicy(String),

    /// A policy definition failed validation at construction time.
    #[error("Invalid policy '{name}': {reason}")]
    InvalidPolicy {
        /// The offending policy name
        name: String,
        /// What was wrong with the definition
        reason: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Counter store errors. Only produced by pluggable remote stores; the
    /// in-memory store cannot fail.
    #[error("Counter store error: {0}")]
    Store(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
