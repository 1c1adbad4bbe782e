//! Configuration for a game runner.

use serde::{Deserialize, Serialize};

use crate::interpreter::DEFAULT_MAX_GOTO_DEPTH;

/// Configuration for a [`GameRunner`](crate::GameRunner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Pause on every line until [`GameRunner::advance`](crate::GameRunner::advance)
    /// is called. When off, lines continue immediately.
    pub wait_for_continue: bool,
    /// Record every emitted event in the bus log.
    pub log_events: bool,
    /// GOTO hops one interaction may take before it is cut off.
    pub max_goto_depth: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            wait_for_continue: false,
            log_events: true,
            max_goto_depth: DEFAULT_MAX_GOTO_DEPTH,
        }
    }
}

impl RunnerConfig {
    /// Pause on every line.
    pub fn with_wait_for_continue(mut self, wait: bool) -> Self {
        self.wait_for_continue = wait;
        self
    }

    /// Turn the event log on or off.
    pub fn with_event_log(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    /// Set the GOTO hop limit (at least 1).
    pub fn with_max_goto_depth(mut self, depth: usize) -> Self {
        self.max_goto_depth = depth.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = RunnerConfig::default();
        assert!(!cfg.wait_for_continue);
        assert!(cfg.log_events);
        assert_eq!(cfg.max_goto_depth, 256);
    }

    #[test]
    fn builder_methods() {
        let cfg = RunnerConfig::default()
            .with_wait_for_continue(true)
            .with_event_log(false)
            .with_max_goto_depth(8);
        assert!(cfg.wait_for_continue);
        assert!(!cfg.log_events);
        assert_eq!(cfg.max_goto_depth, 8);
    }

    #[test]
    fn goto_depth_clamped() {
        let cfg = RunnerConfig::default().with_max_goto_depth(0);
        assert_eq!(cfg.max_goto_depth, 1);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: RunnerConfig = serde_json::from_str(r#"{"waitForContinue": true}"#).unwrap();
        assert!(cfg.wait_for_continue);
        assert!(cfg.log_events);
        assert_eq!(cfg.max_goto_depth, 256);
    }
}
