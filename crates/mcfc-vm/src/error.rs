//! Runtime error types for the reference executor.

use thiserror::Error;

/// Fatal execution errors. Ordinary command failures are not errors: they
/// make the command report failure, exactly as the game does.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Call depth exceeded the configured limit.
    #[error("call depth exceeded the limit of {0}")]
    DepthExceeded(usize),

    /// Too many commands executed in one run.
    #[error("command budget of {0} exhausted")]
    CommandLimitExceeded(u64),

    #[error("cannot parse '{line}': {reason}")]
    Parse { line: String, reason: String },

    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    /// A macro line ran in a function invoked without `with`.
    #[error("macro line in '{0}' run without arguments")]
    MissingMacroArguments(String),

    #[error("macro argument '{0}' is not provided")]
    MissingMacroKey(String),

    #[error("invalid SNBT: {0}")]
    Snbt(String),
}

/// Result alias for executor operations.
pub type VmResult<T> = Result<T, VmError>;
