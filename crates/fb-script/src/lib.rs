//! Story-script front end for Fabula.
//!
//! Turns raw adventure-game story text into a [`Script`]: scenes with
//! hotspots, standalone dialogues and guarded triggers, all pointing into a
//! single statement arena. Loading is forgiving:
//! only empty input is fatal, everything else yields [`Diagnostic`]s.

/// Statement arena and definition tables.
pub mod ast;
/// Boolean condition grammar and evaluation.
pub mod condition;
/// Structural warnings and their rendering.
pub mod diagnostics;
/// Error types for loading.
pub mod error;
/// Condition tokenizer.
pub mod lexer;
/// Block parser for story text.
pub mod parser;
/// Typed flag values.
pub mod value;

pub use ast::{
    Arena, Block, ChoiceOption, Dialogue, Hotspot, Node, Requirement, Scene, Script, Span, Stmt,
    Trigger, Verb,
};
pub use condition::{Condition, ConditionError, Facts};
pub use diagnostics::Diagnostic;
pub use error::{LoadError, LoadResult};
pub use parser::{Parsed, parse};
pub use value::FlagValue;
