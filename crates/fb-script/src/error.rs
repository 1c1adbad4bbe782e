//! Error types for loading story text.

use thiserror::Error;

/// Result type for loading story text.
pub type LoadResult<T> = Result<T, LoadError>;

/// Fatal problems that stop a load. Everything else is a [`crate::Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The story text is empty or whitespace only.
    #[error("story content is empty")]
    Empty,
}
