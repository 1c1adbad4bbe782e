//! Story engine for Fabula.
//!
//! Runs parsed story content against a [`GameState`]: the
//! [`StoryInterpreter`] walks lines and resolves GOTO targets, the
//! [`GameRunner`] turns that into a multi-act game with an [`EventBus`]
//! event stream, save/load and choice queueing, and the [`HeadlessRunner`]
//! replays scripted command lists against it for tests and CI.

/// Publish/subscribe event delivery.
pub mod bus;
/// Runner configuration.
pub mod config;
/// Error types for the engine.
pub mod error;
/// Game events.
pub mod event;
/// Scripted playthroughs.
pub mod headless;
/// Line execution and GOTO resolution.
pub mod interpreter;
/// Multi-act game orchestration.
pub mod runner;
/// Mutable world state.
pub mod state;

pub use bus::{EventBus, SubscriptionId};
pub use config::RunnerConfig;
pub use error::{EngineError, EngineResult};
pub use event::{EventKind, GameEvent};
pub use headless::{Command, Failure, HeadlessRunner, RunReport};
pub use interpreter::{
    Ending, HandlerError, HandlerResult, Input, NoopHandlers, Outcome, Request, SpokenLine,
    StoryHandlers, StoryInterpreter, Walk,
};
pub use runner::{GameRunner, HotspotInfo, SaveGame};
pub use state::{GameState, StateSnapshot};
