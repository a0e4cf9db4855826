//! Error types for tenantfix-edit.
//!
//! Policy blocks map to exit code 2; parse and runtime errors to exit code 1.

use tenantfix_schema::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("policy block: {0}")]
    PolicyBlock(#[from] PolicyBlockError),

    /// The structural engine could not determine block boundaries.
    #[error("schema parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PolicyBlockError {
    /// The input changed since the plan was computed.
    #[error("precondition mismatch: {message}")]
    PreconditionMismatch { message: String },

    /// Strict mode: at least one pass left a model untouched.
    #[error("skipped operations: {message}")]
    SkippedOperations { message: String },
}

impl EditError {
    pub fn exit_code(&self) -> u8 {
        match self {
            EditError::PolicyBlock(_) => 2,
            EditError::Parse(_) | EditError::Runtime(_) => 1,
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;
