use miette::Diagnostic;
use thiserror::Error;

use crate::loader::ForceError;

pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors raised once a tree exists: forcing a defective definition and
/// registry lookups. Build-time defects surface as the richer
/// [`trellis_manifest::Error`] instead.
#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] Box<trellis_manifest::Error>),

    #[error(transparent)]
    Force(#[from] ForceError),

    #[error("command not found: '{path}'")]
    NotFound { path: String },
}
