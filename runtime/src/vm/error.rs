use thiserror::Error;

/// Error type for VM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VMError {
    #[error("Program exhausted: no instructions left to execute")]
    ProgramExhausted,

    #[error("Jump target {target} out of range (program has {len} instructions)")]
    OutOfBounds { target: i64, len: usize },
}

/// Result type for VM operations
pub type VMResult<T> = Result<T, VMError>;
