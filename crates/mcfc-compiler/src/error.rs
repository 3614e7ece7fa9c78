//! Build error types.

use mcfc_codegen::CompileFailure;
use mcfc_linker::LinkError;
use mcfc_types::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a build produced no data pack.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generation reported error diagnostics.
    #[error(transparent)]
    Compile(#[from] CompileFailure),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompilerError {
    /// The generation diagnostics, when generation failed.
    pub fn failure(&self) -> Option<&CompileFailure> {
        match self {
            CompilerError::Compile(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Build result type alias.
pub type CompilerResult<T> = Result<T, CompilerError>;
