//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use adhd_game_core::{CardError, PortError, ValidationError};

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the quest source port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The quest card refused the operation, or the completion it submitted failed.
    #[error("Quest card error: {0}")]
    Card(#[from] CardError),

    /// Progress typed on the command line that is not a number.
    #[error("Invalid progress: {0}")]
    Validation(#[from] ValidationError),

    /// Represents an error from the underlying HTTP client library.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
