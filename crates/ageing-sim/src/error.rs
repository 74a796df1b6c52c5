//! Error types for the simulation drivers.

use thiserror::Error;

/// Result type for simulation runs.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop a simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// The membership engine rejected an operation
    #[error("Network error: {0}")]
    Network(#[from] ageing_network::Error),

    /// Settings are unusable
    #[error("Invalid settings: {0}")]
    Config(String),

    /// An attack gave up before taking over a section
    #[error("No section taken after {0} attacking vaults")]
    AttackLimit(usize),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
