mod executor;
mod config;

pub use executor::{Halt, Runtime};
pub use config::RuntimeConfig;

use thiserror::Error;

/// Errors that can occur in the runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("VM error: {0}")]
    VMError(#[from] crate::vm::VMError),

    #[error("Runtime configuration error: {0}")]
    ConfigError(String),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
