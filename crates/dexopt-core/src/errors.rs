use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running optimization passes
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("invariant violation: interface {interface} has implementors but is missing or external")]
    UnresolvedInterface { interface: String },

    #[error(
        "invariant violation: sole implementor {implementor} of {interface} is missing or external"
    )]
    UnresolvedImplementor {
        interface: String,
        implementor: String,
    },

    #[error(
        "invariant violation: scope did not shrink after removing {removed} interface(s) \
         ({before} classes before, {after} after)"
    )]
    ScopeDidNotShrink {
        removed: usize,
        before: usize,
        after: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OptimizerError {
    /// Invariant violations are data-consistency defects, never transient faults
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            OptimizerError::UnresolvedInterface { .. }
                | OptimizerError::UnresolvedImplementor { .. }
                | OptimizerError::ScopeDidNotShrink { .. }
        )
    }
}

/// Errors raised while loading or writing an application image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed image: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid type descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid member reference: {0}")]
    InvalidMemberRef(String),

    #[error("Unknown access flag `{flag}` on {owner}")]
    UnknownAccessFlag { owner: String, flag: String },

    #[error("Class {0} is defined more than once")]
    DuplicateClass(String),

    #[error("Instruction `{op}` in {method} is missing its `{operand}` operand")]
    MissingOperand {
        method: String,
        op: String,
        operand: &'static str,
    },

    #[error("Image file not found: {path}")]
    NotFound { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
