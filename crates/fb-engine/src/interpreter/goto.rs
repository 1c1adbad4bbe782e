//! GOTO resolution: unwinding out of nested blocks, target lookup,
//! triggers and the terminal sentinels.

use fb_script::Block;
use tracing::{debug, info, warn};

use super::StoryInterpreter;
use super::walk::{Ending, Frame, LineMode, Walk};
use crate::error::EngineResult;

/// Ends the game.
pub const END: &str = "END";
/// Ends the game.
pub const GAME_END: &str = "GAME_END";
/// Ends the game together with a companion.
pub const GAME_END_TOGETHER: &str = "GAME_END_TOGETHER";
/// Ends the current act.
pub const ACT_END: &str = "ACT_END";

impl StoryInterpreter {
    /// Abandon the enclosing blocks up to the nearest definition boundary
    /// and let that boundary follow `target`.
    pub(super) fn unwind(&mut self, walk: &mut Walk, target: String) -> EngineResult<()> {
        loop {
            match walk.frames.pop() {
                Some(Frame::Lines { .. }) => continue,
                Some(boundary) => return self.leave(walk, boundary, Some(target)),
                None => {
                    debug!(target = %target, "goto left to caller");
                    walk.unresolved = Some(target);
                    return Ok(());
                }
            }
        }
    }

    /// Close a boundary frame, either because its content ran out or
    /// because a GOTO unwound to it.
    pub(super) fn leave(
        &mut self,
        walk: &mut Walk,
        boundary: Frame,
        target: Option<String>,
    ) -> EngineResult<()> {
        match boundary {
            Frame::Lines { .. } => Ok(()),
            Frame::Entry => match target {
                Some(target) => self.goto(walk, &target),
                None => Ok(()),
            },
            Frame::Dialogue { id } => {
                self.handlers.dialogue_end(&id)?;
                match target {
                    // END inside a dialogue only closes the dialogue.
                    Some(target) if target != END => self.goto(walk, &target),
                    _ => Ok(()),
                }
            }
            Frame::Cutscene {
                trigger,
                goto,
                announced,
            } => {
                if announced {
                    self.handlers.cutscene_end(&trigger)?;
                }
                match target.or(goto) {
                    Some(target) => self.goto(walk, &target),
                    None => Ok(()),
                }
            }
        }
    }

    /// Resolve a target. Sentinels are handled directly; other names are
    /// looked up as a dialogue, then a trigger, then a scene.
    pub(super) fn goto(&mut self, walk: &mut Walk, target: &str) -> EngineResult<()> {
        walk.hops += 1;
        if walk.hops > self.max_goto_depth {
            warn!(
                target,
                limit = self.max_goto_depth,
                "goto limit reached, stopping"
            );
            return Ok(());
        }

        match target {
            END | GAME_END | GAME_END_TOGETHER => {
                info!(ending = target, "game ended");
                self.handlers.game_end(target)?;
                walk.ending = Some(Ending::Game(target.to_string()));
                return Ok(());
            }
            ACT_END => {
                let act = self.state.current_act();
                info!(act, "act complete");
                let snapshot = self.state.snapshot();
                self.handlers.act_complete(act, &snapshot)?;
                walk.ending = Some(Ending::Act(act));
                return Ok(());
            }
            _ => {}
        }

        if let Some(dialogue) = self.script.dialogue(target) {
            let body = dialogue.body;
            debug!(dialogue = target, "dialogue start");
            self.handlers.dialogue_start(target)?;
            walk.frames.push(Frame::Dialogue {
                id: target.to_string(),
            });
            push_lines(walk, body, LineMode::Interactive);
            return Ok(());
        }

        if self.script.trigger(target).is_some() {
            return self.start_trigger(walk, target);
        }

        if self.script.scene(target).is_some() {
            self.enter_scene_in(walk, target);
            return Ok(());
        }

        warn!(target, "unknown goto target");
        Ok(())
    }

    /// Check a trigger's requirements and, when they all hold, queue its
    /// cutscene and follow-up GOTO.
    fn start_trigger(&mut self, walk: &mut Walk, id: &str) -> EngineResult<()> {
        let Some(trigger) = self.script.trigger(id) else {
            return Ok(());
        };
        if let Some(unmet) = trigger
            .requires
            .iter()
            .find(|r| !r.condition.evaluate(&self.state))
        {
            info!(trigger = id, requirement = %unmet.source, "trigger requirement not met");
            return Ok(());
        }
        let cutscene = trigger.cutscene;
        let goto = trigger.goto.clone();

        debug!(trigger = id, "trigger executed");
        self.handlers.trigger_executed(id)?;
        let announced = !cutscene.is_empty();
        if announced {
            self.handlers.cutscene_start(id)?;
        }
        walk.frames.push(Frame::Cutscene {
            trigger: id.to_string(),
            goto,
            announced,
        });
        push_lines(walk, cutscene, LineMode::Cutscene);
        Ok(())
    }
}

fn push_lines(walk: &mut Walk, block: Block, mode: LineMode) {
    if !block.is_empty() {
        walk.frames.push(Frame::Lines {
            block,
            next: 0,
            mode,
        });
    }
}

/// Whether `target` is one of the terminal sentinels.
pub fn is_sentinel(target: &str) -> bool {
    matches!(target, END | GAME_END | GAME_END_TOGETHER | ACT_END)
}
