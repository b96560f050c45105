//! Ovie CLI library: command implementations and the exit-code contract
//! dispatcher wrapped by the `ovie` binary.

pub mod cli;
pub mod commands;
pub mod diagnostics;

// CLI-specific error handling
pub mod error {
    use thiserror::Error;

    /// Failures of the CLI surface itself (bad flags, unreadable config).
    /// Everything compilation-shaped travels as `ovie_core::Error` and maps
    /// onto the four-value exit contract instead.
    #[derive(Error, Debug)]
    pub enum CliError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Invalid input: {0}")]
        InvalidInput(String),
    }

    pub type Result<T> = std::result::Result<T, CliError>;
}

pub use error::{CliError, Result};
