//! Executes story statements against a [`GameState`].
//!
//! Every entry point returns a [`Walk`]. A walk runs until it finishes or
//! until a line or choice needs the player; [`StoryInterpreter::resume`]
//! feeds the answer back and runs it to the next stop.

mod goto;
mod handlers;
mod walk;


use std::collections::BTreeMap;

use fb_script::{Block, Diagnostic, FlagValue, LoadResult, Script, Stmt, Verb};
use tracing::{debug, warn};

pub use goto::{ACT_END, END, GAME_END, GAME_END_TOGETHER, is_sentinel};
pub use handlers::{HandlerError, HandlerResult, NoopHandlers, StoryHandlers};
pub use walk::{ChoicePrompt, Ending, Input, Outcome, Request, SpokenLine, Walk};

use crate::error::{EngineError, EngineResult};
use crate::state::GameState;
use walk::{Frame, LineMode};

/// Default limit on GOTO hops within one walk.
pub const DEFAULT_MAX_GOTO_DEPTH: usize = 256;

/// One act's content plus the state it runs against.
pub struct StoryInterpreter {
    script: Script,
    state: GameState,
    handlers: Box<dyn StoryHandlers>,
    max_goto_depth: usize,
}

impl Default for StoryInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StoryInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryInterpreter")
            .field("scenes", &self.script.scenes.len())
            .field("dialogues", &self.script.dialogues.len())
            .field("triggers", &self.script.triggers.len())
            .field("state", &self.state)
            .finish()
    }
}

/// The next thing a `Lines` frame asks for, detached from the script borrow.
enum Step {
    Nothing,
    Give(String),
    Set(String, FlagValue),
    Goto(String),
    Enter(Block),
    Say(SpokenLine),
    Offer(ChoicePrompt),
}

impl StoryInterpreter {
    /// An interpreter with no content, empty state and no-op handlers.
    pub fn new() -> Self {
        Self {
            script: Script::default(),
            state: GameState::new(),
            handlers: Box::new(NoopHandlers),
            max_goto_depth: DEFAULT_MAX_GOTO_DEPTH,
        }
    }

    /// Parse story text and replace the loaded content.
    ///
    /// State is left untouched. Returns the structural warnings found.
    pub fn load_content(&mut self, text: &str) -> LoadResult<Vec<Diagnostic>> {
        let parsed = fb_script::parse(text)?;
        for diagnostic in &parsed.diagnostics {
            debug!(line = diagnostic.line_in(text), "{}", diagnostic.message);
        }
        debug!(
            scenes = parsed.script.scenes.len(),
            dialogues = parsed.script.dialogues.len(),
            triggers = parsed.script.triggers.len(),
            "content loaded"
        );
        self.script = parsed.script;
        Ok(parsed.diagnostics)
    }

    /// The loaded content.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Look up a scene.
    pub fn scene(&self, id: &str) -> Option<&fb_script::Scene> {
        self.script.scene(id)
    }

    /// Look up a dialogue.
    pub fn dialogue(&self, id: &str) -> Option<&fb_script::Dialogue> {
        self.script.dialogue(id)
    }

    /// Look up a trigger.
    pub fn trigger(&self, id: &str) -> Option<&fb_script::Trigger> {
        self.script.trigger(id)
    }

    /// The state content runs against.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access to the state.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Replace the whole state.
    pub fn replace_state(&mut self, state: GameState) -> GameState {
        std::mem::replace(&mut self.state, state)
    }

    /// Replace the inventory without announcing anything.
    pub fn set_inventory<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.set_inventory(items);
    }

    /// Replace all flags without announcing anything.
    pub fn set_flags(&mut self, flags: BTreeMap<String, FlagValue>) {
        self.state.set_flags(flags);
    }

    /// Set the current scene without running its ON_ENTER.
    pub fn set_current_scene(&mut self, scene: impl Into<String>) {
        self.state.set_current_scene(scene);
    }

    /// Install host callbacks.
    pub fn set_handlers(&mut self, handlers: Box<dyn StoryHandlers>) {
        self.handlers = handlers;
    }

    /// Limit GOTO hops per walk (at least 1).
    pub fn set_max_goto_depth(&mut self, depth: usize) {
        self.max_goto_depth = depth.max(1);
    }

    // -- Entry points --

    /// Run a block on its own.
    ///
    /// A GOTO ends the walk without being followed; it is reported in the
    /// walk's [`Outcome::goto`].
    pub fn execute_lines(&mut self, block: Block) -> EngineResult<Walk> {
        let mut walk = Walk::lines(block, LineMode::Interactive);
        self.run(&mut walk)?;
        Ok(walk)
    }

    /// Run a block as hotspot or ON_ENTER content: a GOTO is followed.
    pub fn interact(&mut self, block: Block) -> EngineResult<Walk> {
        let mut walk = Walk::default();
        self.push_entry(&mut walk, block);
        self.run(&mut walk)?;
        Ok(walk)
    }

    /// Run a hotspot verb in the current scene.
    ///
    /// Returns `None` when there is no current scene or it has no such hotspot.
    pub fn use_verb(&mut self, hotspot: &str, verb: Verb) -> EngineResult<Option<Walk>> {
        let block = self
            .state
            .current_scene()
            .and_then(|scene| self.script.scene(scene))
            .and_then(|scene| scene.hotspots.get(hotspot))
            .map(|h| h.block(verb));
        match block {
            Some(block) => {
                debug!(hotspot, %verb, "interact");
                self.interact(block).map(Some)
            }
            None => {
                warn!(hotspot, %verb, scene = ?self.state.current_scene(), "unknown hotspot");
                Ok(None)
            }
        }
    }

    /// Enter a scene and run its ON_ENTER. An unknown scene is logged and
    /// yields an already finished walk.
    pub fn enter_scene(&mut self, id: &str) -> EngineResult<Walk> {
        let mut walk = Walk::default();
        self.enter_scene_in(&mut walk, id);
        self.run(&mut walk)?;
        Ok(walk)
    }

    /// Follow a GOTO target from outside any content.
    pub fn handle_goto(&mut self, target: &str) -> EngineResult<Walk> {
        let mut walk = Walk::default();
        self.goto(&mut walk, target)?;
        self.run(&mut walk)?;
        Ok(walk)
    }

    /// Answer what a suspended walk waits for and run it to the next stop.
    pub fn resume(&mut self, walk: &mut Walk, input: Input) -> EngineResult<()> {
        let Some(request) = walk.awaiting.take() else {
            return Err(EngineError::NotAwaiting);
        };
        match (request, input) {
            (Request::Line(_), Input::Continue) => {}
            (Request::Choice(prompt), Input::Choose(choice)) => {
                let available = prompt.bodies.len();
                let Some(body) = choice.checked_sub(1).and_then(|i| prompt.bodies.get(i)) else {
                    walk.awaiting = Some(Request::Choice(prompt));
                    return Err(EngineError::InvalidChoice { choice, available });
                };
                debug!(choice, option = %prompt.options[choice - 1], "choice selected");
                walk.frames.push(Frame::Lines {
                    block: *body,
                    next: 0,
                    mode: prompt.mode,
                });
            }
            (request, input) => {
                let expected = request.describe();
                walk.awaiting = Some(request);
                return Err(EngineError::UnexpectedInput {
                    expected,
                    got: input.describe(),
                });
            }
        }
        // Hops are counted between player inputs.
        walk.hops = 0;
        self.run(walk)
    }

    // -- Execution --

    fn push_entry(&self, walk: &mut Walk, block: Block) {
        if block.is_empty() {
            return;
        }
        walk.frames.push(Frame::Entry);
        walk.frames.push(Frame::Lines {
            block,
            next: 0,
            mode: LineMode::Interactive,
        });
    }

    fn enter_scene_in(&mut self, walk: &mut Walk, id: &str) {
        let Some(scene) = self.script.scene(id) else {
            warn!(scene = id, "unknown scene");
            return;
        };
        let on_enter = scene.on_enter;
        self.state.set_current_scene(id);
        self.push_entry(walk, on_enter);
    }

    /// Run frames until the walk suspends or nothing is left.
    fn run(&mut self, walk: &mut Walk) -> EngineResult<()> {
        loop {
            if walk.awaiting.is_some() {
                return Ok(());
            }
            let Some(frame) = walk.frames.last_mut() else {
                walk.finished = true;
                return Ok(());
            };
            match frame {
                Frame::Lines { block, next, mode } => {
                    let (block, index, mode) = (*block, *next, *mode);
                    if index >= block.len() {
                        walk.frames.pop();
                        continue;
                    }
                    *next += 1;
                    self.step(walk, block, index, mode)?;
                }
                _ => {
                    if let Some(boundary) = walk.frames.pop() {
                        self.leave(walk, boundary, None)?;
                    }
                }
            }
        }
    }

    fn step(&mut self, walk: &mut Walk, block: Block, index: usize, mode: LineMode) -> EngineResult<()> {
        let step = match self.script.arena.child(block, index).map(|n| &n.stmt) {
            None => Step::Nothing,
            Some(Stmt::Give { item }) => Step::Give(item.clone()),
            Some(Stmt::Set { name, value }) => Step::Set(name.clone(), value.clone()),
            Some(Stmt::Goto { target }) => Step::Goto(target.clone()),
            Some(Stmt::If {
                condition,
                then_branch,
                else_branch,
            }) => {
                if condition.evaluate(&self.state) {
                    Step::Enter(*then_branch)
                } else {
                    else_branch.map_or(Step::Nothing, Step::Enter)
                }
            }
            Some(Stmt::Choice { options }) => Step::Offer(ChoicePrompt {
                options: options.iter().map(|o| o.text.clone()).collect(),
                bodies: options.iter().map(|o| o.body).collect(),
                mode,
            }),
            Some(Stmt::Dialogue {
                speaker,
                text,
                thinks,
            }) => Step::Say(SpokenLine::said(speaker.as_str(), text.as_str(), *thinks)),
            Some(Stmt::Narration { text }) => Step::Say(SpokenLine::narrated(text.as_str())),
        };

        match step {
            Step::Nothing => {}
            Step::Give(item) => {
                self.state.add_item(item);
            }
            Step::Set(name, value) => self.state.set_flag(name, value),
            Step::Goto(target) => self.unwind(walk, target)?,
            Step::Enter(block) => walk.frames.push(Frame::Lines {
                block,
                next: 0,
                mode,
            }),
            Step::Say(line) => {
                walk.output.push(line.to_string());
                match mode {
                    LineMode::Interactive => {
                        self.handlers.line(&line)?;
                        walk.awaiting = Some(Request::Line(line));
                    }
                    LineMode::Cutscene => self.handlers.cutscene_line(&line)?,
                }
            }
            Step::Offer(prompt) => {
                if !prompt.options.is_empty() {
                    self.handlers.choice(&prompt.options)?;
                    walk.awaiting = Some(Request::Choice(prompt));
                }
            }
        }
        Ok(())
    }
}
