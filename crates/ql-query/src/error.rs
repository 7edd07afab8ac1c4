//! Error types for the command-line front end.

use thiserror::Error;

/// Errors raised while assembling the command-line configuration.
#[derive(Debug, Error)]
pub enum CliError {
    /// An invalid configuration value was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
