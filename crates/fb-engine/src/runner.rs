//! Drives a multi-act story: wires interpreter callbacks to the event bus,
//! holds suspended interactions, switches acts and saves games.

use std::collections::VecDeque;

use fb_script::{FlagValue, Scene, Verb};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::config::RunnerConfig;
use crate::error::{EngineError, EngineResult};
use crate::event::GameEvent;
use crate::interpreter::{
    Ending, HandlerResult, Input, Request, SpokenLine, StoryHandlers, StoryInterpreter, Walk,
};
use crate::state::{GameState, StateSnapshot};

/// Version written into new saves.
pub const SAVE_VERSION: u32 = 1;

/// Ending name used when the last act completes.
pub const ENDING_COMPLETE: &str = "complete";

/// A saved game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Save format version.
    pub version: u32,
    /// 0-based index of the act in progress.
    pub act: usize,
    /// The full game state.
    pub state: GameState,
}

/// A hotspot the player can interact with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotspotInfo {
    /// Hotspot id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Turns interpreter callbacks into bus events.
struct BusHandlers {
    bus: EventBus,
}

impl BusHandlers {
    fn line_event(line: &SpokenLine, cutscene: bool) -> GameEvent {
        let (speaker, text, thinks) = (line.speaker.clone(), line.text.clone(), line.thinks);
        if cutscene {
            GameEvent::CutsceneLine {
                speaker,
                text,
                thinks,
            }
        } else {
            GameEvent::DialogueLine {
                speaker,
                text,
                thinks,
            }
        }
    }
}

impl StoryHandlers for BusHandlers {
    fn dialogue_start(&mut self, dialogue: &str) -> HandlerResult {
        self.bus.emit(GameEvent::DialogueStart {
            dialogue: dialogue.to_string(),
        });
        Ok(())
    }

    fn line(&mut self, line: &SpokenLine) -> HandlerResult {
        self.bus.emit(Self::line_event(line, false));
        Ok(())
    }

    fn choice(&mut self, options: &[String]) -> HandlerResult {
        self.bus.emit(GameEvent::DialogueChoice {
            options: options.to_vec(),
        });
        Ok(())
    }

    fn dialogue_end(&mut self, dialogue: &str) -> HandlerResult {
        self.bus.emit(GameEvent::DialogueEnd {
            dialogue: dialogue.to_string(),
        });
        Ok(())
    }

    fn trigger_executed(&mut self, trigger: &str) -> HandlerResult {
        self.bus.emit(GameEvent::TriggerExecute {
            trigger: trigger.to_string(),
        });
        Ok(())
    }

    fn cutscene_start(&mut self, trigger: &str) -> HandlerResult {
        self.bus.emit(GameEvent::CutsceneStart {
            trigger: trigger.to_string(),
        });
        Ok(())
    }

    fn cutscene_line(&mut self, line: &SpokenLine) -> HandlerResult {
        self.bus.emit(Self::line_event(line, true));
        Ok(())
    }

    fn cutscene_end(&mut self, trigger: &str) -> HandlerResult {
        self.bus.emit(GameEvent::CutsceneEnd {
            trigger: trigger.to_string(),
        });
        Ok(())
    }

    fn act_complete(&mut self, act: i64, snapshot: &StateSnapshot) -> HandlerResult {
        self.bus.emit(GameEvent::ActComplete {
            act,
            inventory: snapshot.inventory.clone(),
            flags: snapshot.flags.clone(),
        });
        Ok(())
    }

    fn game_end(&mut self, ending: &str) -> HandlerResult {
        self.bus.emit(GameEvent::GameEnd {
            ending: ending.to_string(),
        });
        Ok(())
    }
}

/// Plays a sequence of acts against one event bus.
///
/// Interactions that stop on a line or a choice are kept on a stack; the
/// most recent one is answered first by [`advance`](Self::advance) and
/// [`select_choice`](Self::select_choice). A choice selected while nothing
/// waits for one is queued and answers the next prompt.
#[derive(Debug)]
pub struct GameRunner {
    acts: Vec<String>,
    act: usize,
    interpreter: StoryInterpreter,
    bus: EventBus,
    config: RunnerConfig,
    suspended: Vec<Walk>,
    queued_choices: VecDeque<usize>,
    started: bool,
    ended: bool,
}

impl GameRunner {
    /// A runner over act texts with default configuration.
    pub fn new(acts: Vec<String>) -> EngineResult<Self> {
        Self::with_config(acts, RunnerConfig::default())
    }

    /// A runner over act texts. The first act is loaded immediately.
    pub fn with_config(acts: Vec<String>, config: RunnerConfig) -> EngineResult<Self> {
        let Some(first) = acts.first() else {
            return Err(EngineError::NoActs);
        };
        let bus = EventBus::new();
        bus.set_logging(config.log_events);
        let interpreter = load_act(first, &bus, &config)?;
        Ok(Self {
            acts,
            act: 0,
            interpreter,
            bus,
            config,
            suspended: Vec::new(),
            queued_choices: VecDeque::new(),
            started: false,
            ended: false,
        })
    }

    // -- Accessors --

    /// The event bus every event goes out on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The game state.
    pub fn state(&self) -> &GameState {
        self.interpreter.state()
    }

    /// The interpreter for the current act.
    pub fn interpreter(&self) -> &StoryInterpreter {
        &self.interpreter
    }

    /// 1-based number of the act being played.
    pub fn current_act(&self) -> usize {
        self.act + 1
    }

    /// Number of acts.
    pub fn act_count(&self) -> usize {
        self.acts.len()
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether a terminal point was reached.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// What the most recent suspended interaction waits for.
    pub fn pending(&self) -> Option<&Request> {
        self.suspended.last().and_then(Walk::request)
    }

    /// Number of suspended interactions.
    pub fn pending_count(&self) -> usize {
        self.suspended.len()
    }

    /// Number of queued choice selections.
    pub fn queued_choice_count(&self) -> usize {
        self.queued_choices.len()
    }

    /// The scene the player is in.
    pub fn scene(&self) -> Option<&Scene> {
        self.state()
            .current_scene()
            .and_then(|id| self.interpreter.scene(id))
    }

    /// Hotspots of the current scene, in the order they were written.
    pub fn available_hotspots(&self) -> Vec<HotspotInfo> {
        self.scene()
            .map(|scene| {
                scene
                    .hotspots
                    .values()
                    .map(|h| HotspotInfo {
                        id: h.id.clone(),
                        name: h.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Description of the current scene, one line per description line.
    pub fn scene_description(&self) -> Option<String> {
        self.scene().map(|scene| scene.description.join("\n"))
    }

    // -- Lifecycle --

    /// Announce the game and enter the first act's starting scene.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.started {
            warn!("runner already started");
            return Ok(());
        }
        self.started = true;
        self.ended = false;
        info!(acts = self.acts.len(), "game started");
        self.bus.emit(GameEvent::GameStart);
        self.begin_act()
    }

    /// Abandon every suspended interaction and queued choice.
    pub fn stop(&mut self) {
        info!(pending = self.suspended.len(), "runner stopped");
        self.suspended.clear();
        self.queued_choices.clear();
        self.started = false;
    }

    fn begin_act(&mut self) -> EngineResult<()> {
        let scene = self
            .interpreter
            .script()
            .first_scene()
            .map(|s| s.id.clone());
        self.bus.emit(GameEvent::ActStart {
            act: self.current_act(),
            scene: scene.clone(),
        });
        match scene {
            Some(scene) => self.enter_scene(&scene),
            None => {
                warn!(act = self.current_act(), "act has no scenes");
                Ok(())
            }
        }
    }

    fn next_act(&mut self) -> EngineResult<()> {
        let next = self.act + 1;
        let Some(text) = self.acts.get(next) else {
            info!("final act complete");
            self.bus.emit(GameEvent::GameEnd {
                ending: ENDING_COMPLETE.to_string(),
            });
            self.ended = true;
            return Ok(());
        };
        let mut interpreter = load_act(text, &self.bus, &self.config)?;
        self.interpreter
            .state()
            .carry_into(interpreter.state_mut());
        if !self.suspended.is_empty() {
            warn!(
                count = self.suspended.len(),
                "discarding interactions suspended in the previous act"
            );
            self.suspended.clear();
        }
        self.interpreter = interpreter;
        self.act = next;
        info!(act = self.current_act(), "act started");
        self.begin_act()
    }

    // -- Player actions --

    /// Enter a scene.
    pub fn enter_scene(&mut self, scene: &str) -> EngineResult<()> {
        let walk = self.interpreter.enter_scene(scene)?;
        self.drive(walk)
    }

    /// Run a hotspot's LOOK block.
    pub fn look_at(&mut self, hotspot: &str) -> EngineResult<()> {
        self.interact(hotspot, Verb::Look)
    }

    /// Run a hotspot's TALK block.
    pub fn talk_to(&mut self, hotspot: &str) -> EngineResult<()> {
        self.interact(hotspot, Verb::Talk)
    }

    /// Run a hotspot's USE block.
    pub fn use_hotspot(&mut self, hotspot: &str) -> EngineResult<()> {
        self.interact(hotspot, Verb::Use)
    }

    fn interact(&mut self, hotspot: &str, verb: Verb) -> EngineResult<()> {
        match self.interpreter.use_verb(hotspot, verb)? {
            Some(walk) => self.drive(walk),
            None => Ok(()),
        }
    }

    /// Answer the most recent choice prompt, or queue the selection for the
    /// next prompt when none is waiting.
    pub fn select_choice(&mut self, choice: usize) -> EngineResult<()> {
        let waiting = self
            .suspended
            .iter()
            .rposition(|w| matches!(w.request(), Some(Request::Choice(_))));
        let Some(index) = waiting else {
            debug!(choice, "choice queued");
            self.queued_choices.push_back(choice);
            return Ok(());
        };
        let mut walk = self.suspended.remove(index);
        if let Err(err) = self.interpreter.resume(&mut walk, Input::Choose(choice)) {
            if walk.request().is_some() {
                self.suspended.insert(index, walk);
            }
            return Err(err);
        }
        self.drive(walk)
    }

    /// Move past the most recent line shown. Returns `false` when no line
    /// was waiting.
    pub fn advance(&mut self) -> EngineResult<bool> {
        let waiting = self
            .suspended
            .iter()
            .rposition(|w| matches!(w.request(), Some(Request::Line(_))));
        let Some(index) = waiting else {
            return Ok(false);
        };
        let mut walk = self.suspended.remove(index);
        self.interpreter.resume(&mut walk, Input::Continue)?;
        self.drive(walk)?;
        Ok(true)
    }

    /// Give the player an item.
    pub fn add_item(&mut self, item: &str) -> bool {
        self.interpreter.state_mut().add_item(item)
    }

    /// Take an item from the player.
    pub fn remove_item(&mut self, item: &str) -> bool {
        self.interpreter.state_mut().remove_item(item)
    }

    /// Write a flag.
    pub fn set_flag(&mut self, name: &str, value: impl Into<FlagValue>) {
        self.interpreter.state_mut().set_flag(name, value);
    }

    /// Run a walk until it needs input nobody has given yet, then park it.
    fn drive(&mut self, mut walk: Walk) -> EngineResult<()> {
        loop {
            let input = match walk.request() {
                None => return self.finish(walk),
                Some(Request::Line(_)) if !self.config.wait_for_continue => Input::Continue,
                Some(Request::Line(_)) => {
                    self.suspended.push(walk);
                    return Ok(());
                }
                Some(Request::Choice(_)) => match self.queued_choices.pop_front() {
                    Some(choice) => Input::Choose(choice),
                    None => {
                        self.suspended.push(walk);
                        return Ok(());
                    }
                },
            };
            if let Err(err) = self.interpreter.resume(&mut walk, input) {
                if walk.request().is_some() {
                    self.suspended.push(walk);
                }
                return Err(err);
            }
        }
    }

    fn finish(&mut self, walk: Walk) -> EngineResult<()> {
        let Some(outcome) = walk.outcome() else {
            return Ok(());
        };
        match outcome.ending {
            Some(Ending::Act(act)) => {
                debug!(act, "act ended");
                self.next_act()
            }
            Some(Ending::Game(ending)) => {
                debug!(%ending, "game ended");
                self.ended = true;
                Ok(())
            }
            None => Ok(()),
        }
    }

    // -- Persistence --

    /// Serialise the act in progress and the full state.
    pub fn save(&self) -> EngineResult<String> {
        let save = SaveGame {
            version: SAVE_VERSION,
            act: self.act,
            state: self.interpreter.state().clone(),
        };
        Ok(serde_json::to_string_pretty(&save)?)
    }

    /// Restore a save, switching act content when needed. Suspended
    /// interactions and queued choices are discarded.
    pub fn load(&mut self, json: &str) -> EngineResult<()> {
        let save: SaveGame = serde_json::from_str(json)?;
        if save.version > SAVE_VERSION {
            warn!(version = save.version, "save is newer than this engine");
        }
        if save.act != self.act {
            let text = self
                .acts
                .get(save.act)
                .ok_or(EngineError::UnknownAct(save.act))?;
            self.interpreter = load_act(text, &self.bus, &self.config)?;
            self.act = save.act;
        }
        let mut state = save.state;
        state.attach_bus(self.bus.clone());
        self.interpreter.replace_state(state);
        self.suspended.clear();
        self.queued_choices.clear();
        self.ended = false;
        info!(act = self.current_act(), "game loaded");
        Ok(())
    }
}

/// Parse one act and wire it to the bus.
fn load_act(text: &str, bus: &EventBus, config: &RunnerConfig) -> EngineResult<StoryInterpreter> {
    let mut interpreter = StoryInterpreter::new();
    let diagnostics = interpreter.load_content(text)?;
    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "act loaded with warnings");
    }
    interpreter.set_handlers(Box::new(BusHandlers { bus: bus.clone() }));
    interpreter.set_max_goto_depth(config.max_goto_depth);
    interpreter.state_mut().attach_bus(bus.clone());
    Ok(interpreter)
}
