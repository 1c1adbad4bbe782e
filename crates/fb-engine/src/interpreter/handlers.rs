//! Host callbacks for narrative notifications.

use thiserror::Error;

use super::walk::SpokenLine;
use crate::state::StateSnapshot;

/// Result type for host callbacks.
pub type HandlerResult = Result<(), HandlerError>;

/// A failure reported by a host callback.
///
/// It aborts the walk that made the call and reaches the caller as
/// [`EngineError::Handler`](crate::EngineError::Handler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// A failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Callbacks the interpreter makes as a story plays. Every method defaults
/// to doing nothing.
///
/// State changes (items, flags, scenes) are not reported here; they go out
/// on the [`EventBus`](crate::EventBus) attached to the state.
pub trait StoryHandlers {
    /// A DIALOGUE definition started.
    fn dialogue_start(&mut self, _dialogue: &str) -> HandlerResult {
        Ok(())
    }

    /// A line is shown and the walk now waits for a continue.
    fn line(&mut self, _line: &SpokenLine) -> HandlerResult {
        Ok(())
    }

    /// Options are offered and the walk now waits for a choice.
    fn choice(&mut self, _options: &[String]) -> HandlerResult {
        Ok(())
    }

    /// A DIALOGUE definition finished.
    fn dialogue_end(&mut self, _dialogue: &str) -> HandlerResult {
        Ok(())
    }

    /// A trigger's requirements held and it is about to run.
    fn trigger_executed(&mut self, _trigger: &str) -> HandlerResult {
        Ok(())
    }

    /// A trigger's cutscene started.
    fn cutscene_start(&mut self, _trigger: &str) -> HandlerResult {
        Ok(())
    }

    /// A cutscene line was shown. Cutscenes never wait.
    fn cutscene_line(&mut self, _line: &SpokenLine) -> HandlerResult {
        Ok(())
    }

    /// A trigger's cutscene finished.
    fn cutscene_end(&mut self, _trigger: &str) -> HandlerResult {
        Ok(())
    }

    /// `ACT_END` was reached.
    fn act_complete(&mut self, _act: i64, _snapshot: &StateSnapshot) -> HandlerResult {
        Ok(())
    }

    /// A game-ending sentinel was reached.
    fn game_end(&mut self, _ending: &str) -> HandlerResult {
        Ok(())
    }
}

/// Handlers that ignore every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandlers;

impl StoryHandlers for NoopHandlers {}
