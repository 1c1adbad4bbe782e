//! Error types for the story engine.

use fb_script::LoadError;
use thiserror::Error;

use crate::interpreter::HandlerError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to the caller of the interpreter or runner.
///
/// Content problems at run time (an unknown GOTO target, an unmet trigger
/// requirement, an unknown hotspot) are logged instead, and never show up here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Story text could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A host callback failed; the walk that called it is abandoned.
    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),

    /// `resume` was called on a walk that is not waiting for input.
    #[error("nothing is waiting for input")]
    NotAwaiting,

    /// The input does not match what the walk is waiting for.
    #[error("expected {expected}, got {got}")]
    UnexpectedInput {
        /// The kind of input the walk waits for.
        expected: &'static str,
        /// The kind of input that was given.
        got: &'static str,
    },

    /// A choice number outside `1..=available`.
    #[error("invalid choice {choice}: {available} option(s) available")]
    InvalidChoice {
        /// The 1-indexed selection that was given.
        choice: usize,
        /// How many options the prompt offered.
        available: usize,
    },

    /// Save data could not be written or read.
    #[error("save data error: {0}")]
    Save(#[from] serde_json::Error),

    /// A save refers to an act that is not loaded.
    #[error("act {0} does not exist")]
    UnknownAct(usize),

    /// A runner was created without any act content.
    #[error("no acts to play")]
    NoActs,
}
