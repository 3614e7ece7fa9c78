//! Codegen error types.

use mcfc_types::CompileErrors;
use thiserror::Error;

/// Internal failures of the code generator.
///
/// User mistakes are reported as diagnostics in [`CompileErrors`]; these
/// errors mean the engine itself was driven into an inconsistent state.
#[derive(Debug, Clone, Error)]
pub enum CodegenError {
    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),

    /// A procedure body was opened a second time.
    #[error("procedure '{0}' was already written")]
    AlreadyWritten(String),

    /// Emission with no procedure under the cursor.
    #[error("no procedure is open for emission: {0}")]
    NoOpenProcedure(String),
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Why [`Compiler::finish`](crate::Compiler::finish) produced no output.
#[derive(Debug, Error)]
#[error("compilation failed: {} error(s), {} internal error(s)", .errors.total_errors, .internal.len())]
pub struct CompileFailure {
    pub errors: CompileErrors,
    pub internal: Vec<CodegenError>,
}

impl CompileFailure {
    /// Human-readable listing of every problem.
    pub fn report(&self) -> String {
        let mut out = self.errors.to_string();
        for err in &self.internal {
            out.push_str(&err.to_string());
            out.push('\n');
        }
        out
    }
}
