//! An in-flight execution of story statements.

use std::fmt;

use fb_script::Block;
use serde::Serialize;

/// A line of dialogue or narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpokenLine {
    /// Speaker, absent for narration.
    pub speaker: Option<String>,
    /// The text.
    pub text: String,
    /// Whether the line is an inner thought.
    pub thinks: bool,
}

impl SpokenLine {
    /// A spoken line.
    pub fn said(speaker: impl Into<String>, text: impl Into<String>, thinks: bool) -> Self {
        Self {
            speaker: Some(speaker.into()),
            text: text.into(),
            thinks,
        }
    }

    /// A narrated line.
    pub fn narrated(text: impl Into<String>) -> Self {
        Self {
            speaker: None,
            text: text.into(),
            thinks: false,
        }
    }
}

impl fmt::Display for SpokenLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.speaker, self.thinks) {
            (Some(speaker), true) => write!(f, "{speaker} (thinks): {}", self.text),
            (Some(speaker), false) => write!(f, "{speaker}: {}", self.text),
            (None, _) => f.write_str(&self.text),
        }
    }
}

/// Whether lines pause for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineMode {
    Interactive,
    Cutscene,
}

/// A CHOICE waiting for a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoicePrompt {
    /// Option texts; selections are 1-indexed.
    pub options: Vec<String>,
    pub(crate) bodies: Vec<Block>,
    pub(crate) mode: LineMode,
}

/// What a suspended walk is waiting for.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// A line was shown; resume with [`Input::Continue`].
    Line(SpokenLine),
    /// Options were offered; resume with [`Input::Choose`].
    Choice(ChoicePrompt),
}

impl Request {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Line(_) => "continue",
            Self::Choice(_) => "choice",
        }
    }
}

/// Input that resumes a suspended walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Move past a line.
    Continue,
    /// Pick an option, 1-indexed.
    Choose(usize),
}

impl Input {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Choose(_) => "choice",
        }
    }
}

/// A terminal point reached by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    /// `END`, `GAME_END` or `GAME_END_TOGETHER`; holds the sentinel.
    Game(String),
    /// `ACT_END`, with the act number read from the `current_act` flag.
    Act(i64),
}

/// How a finished walk ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// A GOTO left unresolved because the lines ran outside any definition.
    pub goto: Option<String>,
    /// A terminal point, when one was reached.
    pub ending: Option<Ending>,
}

#[derive(Debug, Clone)]
pub(crate) enum Frame {
    /// Statements being executed; `next` is the index of the next one.
    Lines {
        block: Block,
        next: usize,
        mode: LineMode,
    },
    /// A running DIALOGUE definition.
    Dialogue { id: String },
    /// A running trigger; its cutscene lines sit above it.
    Cutscene {
        trigger: String,
        goto: Option<String>,
        announced: bool,
    },
    /// Scene ON_ENTER or hotspot verb content.
    Entry,
}

/// The state of one interaction: the frames still to run, what it waits
/// for, and the lines it produced.
///
/// Created by the [`StoryInterpreter`](super::StoryInterpreter) entry points
/// and driven forward with [`StoryInterpreter::resume`](super::StoryInterpreter::resume).
#[derive(Debug, Clone, Default)]
pub struct Walk {
    pub(crate) frames: Vec<Frame>,
    pub(crate) awaiting: Option<Request>,
    pub(crate) output: Vec<String>,
    pub(crate) unresolved: Option<String>,
    pub(crate) ending: Option<Ending>,
    pub(crate) hops: usize,
    pub(crate) finished: bool,
}

impl Walk {
    pub(crate) fn lines(block: Block, mode: LineMode) -> Self {
        Self {
            frames: vec![Frame::Lines {
                block,
                next: 0,
                mode,
            }],
            ..Self::default()
        }
    }

    /// What the walk waits for, if it is suspended.
    pub fn request(&self) -> Option<&Request> {
        self.awaiting.as_ref()
    }

    /// Whether the walk ran to completion.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Rendered lines produced so far, cutscene lines included.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// How the walk ended, once it has.
    pub fn outcome(&self) -> Option<Outcome> {
        self.finished.then(|| Outcome {
            goto: self.unresolved.clone(),
            ending: self.ending.clone(),
        })
    }
}
