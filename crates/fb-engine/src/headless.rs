//! Scripted playthroughs: navigation commands plus assertions against the
//! state and the event log.

use std::fmt;

use fb_script::FlagValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::event::{EventKind, GameEvent};
use crate::interpreter::Request;
use crate::runner::GameRunner;

/// Lines continued automatically before one assertion gives up.
const MAX_AUTO_CONTINUES: usize = 4096;

/// One step of a scripted playthrough.
///
/// Written in JSON as `{"command": "talkTo", "hotspot": "guard"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Enter a scene.
    EnterScene {
        /// Scene id.
        scene: String,
    },
    /// Look at a hotspot in the current scene.
    LookAt {
        /// Hotspot id.
        hotspot: String,
    },
    /// Talk to a hotspot in the current scene.
    TalkTo {
        /// Hotspot id.
        hotspot: String,
    },
    /// Use a hotspot in the current scene.
    Use {
        /// Hotspot id.
        hotspot: String,
    },
    /// Answer a choice prompt, or queue the answer for the next one.
    SelectChoice {
        /// 1-indexed option.
        choice: usize,
    },
    /// Check a flag value. A missing flag reads as `false`.
    AssertFlag {
        /// Flag name.
        flag: String,
        /// Expected value.
        value: FlagValue,
    },
    /// Check whether an item is held.
    AssertInventory {
        /// Item id.
        item: String,
        /// Whether the item should be held.
        #[serde(default = "held")]
        present: bool,
    },
    /// Check the current scene.
    AssertScene {
        /// Expected scene id.
        scene: String,
    },
    /// Check that a matching event was emitted.
    AssertEvent {
        /// Event type, e.g. `inventory_add`.
        event: String,
        /// Fields the event must carry with these exact values.
        #[serde(default)]
        fields: Map<String, Value>,
    },
    /// Check that no matching event was emitted.
    AssertNotEvent {
        /// Event type, e.g. `trigger_execute`.
        event: String,
        /// Fields the event must carry with these exact values.
        #[serde(default)]
        fields: Map<String, Value>,
    },
}

fn held() -> bool {
    true
}

impl Command {
    fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::AssertFlag { .. }
                | Self::AssertInventory { .. }
                | Self::AssertScene { .. }
                | Self::AssertEvent { .. }
                | Self::AssertNotEvent { .. }
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnterScene { scene } => write!(f, "enterScene {scene}"),
            Self::LookAt { hotspot } => write!(f, "lookAt {hotspot}"),
            Self::TalkTo { hotspot } => write!(f, "talkTo {hotspot}"),
            Self::Use { hotspot } => write!(f, "use {hotspot}"),
            Self::SelectChoice { choice } => write!(f, "selectChoice {choice}"),
            Self::AssertFlag { flag, value } => write!(f, "assertFlag {flag} == {value}"),
            Self::AssertInventory { item, present } => {
                let verb = if *present { "has" } else { "lacks" };
                write!(f, "assertInventory {verb} {item}")
            }
            Self::AssertScene { scene } => write!(f, "assertScene {scene}"),
            Self::AssertEvent { event, fields } => {
                write!(f, "assertEvent {event}")?;
                write_fields(f, fields)
            }
            Self::AssertNotEvent { event, fields } => {
                write!(f, "assertNotEvent {event}")?;
                write_fields(f, fields)
            }
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &Map<String, Value>) -> fmt::Result {
    if fields.is_empty() {
        return Ok(());
    }
    write!(f, " {}", Value::Object(fields.clone()))
}

/// A command that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// 0-based position of the command in the list.
    pub index: usize,
    /// The command, rendered.
    pub command: String,
    /// What went wrong.
    pub message: String,
}

/// Result of a scripted playthrough.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Whether every command succeeded.
    pub passed: bool,
    /// Number of commands executed.
    pub commands: usize,
    /// Every failure, in command order.
    pub failures: Vec<Failure>,
    /// The full event log.
    pub events: Vec<GameEvent>,
}

/// Executes commands against a [`GameRunner`], collecting failures instead
/// of stopping at the first one.
#[derive(Debug)]
pub struct HeadlessRunner {
    runner: GameRunner,
}

impl HeadlessRunner {
    /// Wrap a runner, turning on its event log.
    pub fn new(runner: GameRunner) -> Self {
        runner.bus().set_logging(true);
        Self { runner }
    }

    /// The wrapped runner.
    pub fn runner(&self) -> &GameRunner {
        &self.runner
    }

    /// Mutable access to the wrapped runner.
    pub fn runner_mut(&mut self) -> &mut GameRunner {
        &mut self.runner
    }

    /// Unwrap the runner.
    pub fn into_runner(self) -> GameRunner {
        self.runner
    }

    /// Execute every command in order.
    pub fn run(&mut self, commands: &[Command]) -> RunReport {
        let mut failures = Vec::new();
        for (index, command) in commands.iter().enumerate() {
            debug!(index, %command, "headless command");
            if command.is_assertion() {
                if let Err(message) = self.settle() {
                    failures.push(failure(index, command, message));
                    continue;
                }
            }
            if let Err(message) = self.execute(command) {
                warn!(index, %command, %message, "headless command failed");
                failures.push(failure(index, command, message));
            }
        }
        RunReport {
            passed: failures.is_empty(),
            commands: commands.len(),
            failures,
            events: self.runner.bus().events(),
        }
    }

    /// Continue past every line still shown so pending interactions run to
    /// completion. A pending choice cannot be settled without a
    /// `selectChoice` and is reported.
    fn settle(&mut self) -> Result<(), String> {
        for _ in 0..MAX_AUTO_CONTINUES {
            if !self.runner.advance().map_err(|e| e.to_string())? {
                break;
            }
        }
        let Some(request) = self.runner.pending() else {
            return Ok(());
        };
        let waiting = match request {
            Request::Line(line) => {
                format!("a continue after \"{line}\" ({MAX_AUTO_CONTINUES} lines continued)")
            }
            Request::Choice(prompt) => format!("a choice among {:?}", prompt.options),
        };
        Err(format!(
            "{} interaction(s) still pending, waiting for {waiting}",
            self.runner.pending_count()
        ))
    }

    fn execute(&mut self, command: &Command) -> Result<(), String> {
        let runner = &mut self.runner;
        match command {
            Command::EnterScene { scene } => runner.enter_scene(scene).map_err(|e| e.to_string()),
            Command::LookAt { hotspot } => runner.look_at(hotspot).map_err(|e| e.to_string()),
            Command::TalkTo { hotspot } => runner.talk_to(hotspot).map_err(|e| e.to_string()),
            Command::Use { hotspot } => runner.use_hotspot(hotspot).map_err(|e| e.to_string()),
            Command::SelectChoice { choice } => {
                runner.select_choice(*choice).map_err(|e| e.to_string())
            }
            Command::AssertFlag { flag, value } => {
                let actual = runner.state().flag(flag).cloned().unwrap_or_default();
                if actual.loose_eq(value) {
                    Ok(())
                } else {
                    Err(format!("flag {flag} is {actual}, expected {value}"))
                }
            }
            Command::AssertInventory { item, present } => {
                match (runner.state().has_item(item), *present) {
                    (true, false) => Err(format!("inventory unexpectedly holds {item}")),
                    (false, true) => Err(format!("inventory does not hold {item}")),
                    _ => Ok(()),
                }
            }
            Command::AssertScene { scene } => match runner.state().current_scene() {
                Some(current) if current == scene => Ok(()),
                Some(current) => Err(format!("current scene is {current}, expected {scene}")),
                None => Err(format!("no current scene, expected {scene}")),
            },
            Command::AssertEvent { event, fields } => {
                let kind = parse_kind(event)?;
                if self.find_event(kind, fields) {
                    Ok(())
                } else {
                    Err(format!("no {kind} event{}", describe_fields(fields)))
                }
            }
            Command::AssertNotEvent { event, fields } => {
                let kind = parse_kind(event)?;
                if self.find_event(kind, fields) {
                    Err(format!("unexpected {kind} event{}", describe_fields(fields)))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn find_event(&self, kind: EventKind, fields: &Map<String, Value>) -> bool {
        self.runner
            .bus()
            .events_of(kind)
            .iter()
            .any(|event| event_matches(event, fields))
    }
}

fn failure(index: usize, command: &Command, message: String) -> Failure {
    Failure {
        index,
        command: command.to_string(),
        message,
    }
}

fn parse_kind(event: &str) -> Result<EventKind, String> {
    EventKind::parse(event).ok_or_else(|| format!("unknown event type: {event}"))
}

fn describe_fields(fields: &Map<String, Value>) -> String {
    if fields.is_empty() {
        String::new()
    } else {
        format!(" with {}", Value::Object(fields.clone()))
    }
}

/// Whether every expected field is present on the event with an equal value.
pub fn event_matches(event: &GameEvent, fields: &Map<String, Value>) -> bool {
    let Ok(Value::Object(actual)) = serde_json::to_value(event) else {
        return false;
    };
    fields
        .iter()
        .all(|(key, expected)| actual.get(key) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use serde_json::json;

    const STORY: &str = r#"
SCENE gate
    HOTSPOT guard "Gate Guard"
        TALK
            -> guard_talk
        END
    END
    HOTSPOT stone "Loose Stone"
        LOOK
            "Something glints beneath it."
        END
        USE
            GIVE coin
        END
    END
END

SCENE market
END

DIALOGUE guard_talk
    Guard: "Toll is one coin."
    CHOICE
        > "Pay"
            IF HAS(coin)
                SET paid = true
                -> market
            ELSE
                Guard: "You have no coin."
            END
        > "Leave"
            "You walk away."
    END
END
"#;

    fn headless() -> HeadlessRunner {
        let mut runner = GameRunner::new(vec![STORY.to_string()]).unwrap();
        runner.start().unwrap();
        HeadlessRunner::new(runner)
    }

    fn commands(value: Value) -> Vec<Command> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn commands_parse_from_json() {
        let parsed = commands(json!([
            {"command": "enterScene", "scene": "gate"},
            {"command": "use", "hotspot": "stone"},
            {"command": "selectChoice", "choice": 2},
            {"command": "assertFlag", "flag": "paid", "value": true},
            {"command": "assertInventory", "item": "coin"},
            {"command": "assertEvent", "event": "inventory_add", "fields": {"item": "coin"}},
            {"command": "assertNotEvent", "event": "game_end"},
        ]));
        assert_eq!(parsed.len(), 7);
        assert_eq!(
            parsed[4],
            Command::AssertInventory {
                item: "coin".into(),
                present: true
            }
        );
        assert!(matches!(&parsed[6], Command::AssertNotEvent { fields, .. } if fields.is_empty()));
    }

    #[test]
    fn successful_playthrough() {
        let mut headless = headless();
        let report = headless.run(&commands(json!([
            {"command": "assertScene", "scene": "gate"},
            {"command": "use", "hotspot": "stone"},
            {"command": "assertInventory", "item": "coin"},
            {"command": "assertScene", "scene": "gate"},
            {"command": "selectChoice", "choice": 1},
            {"command": "talkTo", "hotspot": "guard"},
            {"command": "assertFlag", "flag": "paid", "value": true},
            {"command": "assertScene", "scene": "market"},
            {"command": "assertEvent", "event": "scene_exit", "fields": {"scene": "gate"}},
            {"command": "assertEvent", "event": "dialogueChoice"},
            {"command": "assertNotEvent", "event": "dialogue_line", "fields": {"text": "You have no coin."}},
        ])));
        assert!(report.passed, "{:?}", report.failures);
        assert_eq!(report.commands, 11);
        assert!(report.events.contains(&GameEvent::DialogueEnd {
            dialogue: "guard_talk".into()
        }));
    }

    #[test]
    fn failures_are_collected() {
        let mut headless = headless();
        let report = headless.run(&commands(json!([
            {"command": "assertFlag", "flag": "paid", "value": true},
            {"command": "assertInventory", "item": "coin"},
            {"command": "assertScene", "scene": "market"},
            {"command": "assertEvent", "event": "trigger_execute"},
            {"command": "assertEvent", "event": "no_such_event"},
            {"command": "assertFlag", "flag": "paid", "value": false},
        ])));
        assert!(!report.passed);
        let indexes: Vec<_> = report.failures.iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
        assert_eq!(report.failures[2].message, "current scene is gate, expected market");
        assert_eq!(report.failures[4].message, "unknown event type: no_such_event");
    }

    #[test]
    fn assertion_fails_while_interaction_pending() {
        let mut headless = headless();
        let report = headless.run(&commands(json!([
            {"command": "talkTo", "hotspot": "guard"},
            {"command": "assertScene", "scene": "gate"},
            {"command": "selectChoice", "choice": 2},
            {"command": "assertScene", "scene": "gate"},
        ])));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(report.failures[0].message.contains("Pay"));
    }

    #[test]
    fn assertions_continue_past_waiting_lines() {
        let config = RunnerConfig::default().with_wait_for_continue(true);
        let mut runner = GameRunner::with_config(vec![STORY.to_string()], config).unwrap();
        runner.start().unwrap();
        let mut headless = HeadlessRunner::new(runner);
        let report = headless.run(&commands(json!([
            {"command": "use", "hotspot": "stone"},
            {"command": "lookAt", "hotspot": "stone"},
            {"command": "assertInventory", "item": "coin"},
            {"command": "selectChoice", "choice": 1},
            {"command": "talkTo", "hotspot": "guard"},
            {"command": "assertFlag", "flag": "paid", "value": true},
            {"command": "assertScene", "scene": "market"},
        ])));
        assert!(report.passed, "{:?}", report.failures);
        assert_eq!(headless.runner().pending_count(), 0);
    }

    #[test]
    fn waiting_choice_still_fails_assertions_in_wait_mode() {
        let config = RunnerConfig::default().with_wait_for_continue(true);
        let mut runner = GameRunner::with_config(vec![STORY.to_string()], config).unwrap();
        runner.start().unwrap();
        let mut headless = HeadlessRunner::new(runner);
        let report = headless.run(&commands(json!([
            {"command": "talkTo", "hotspot": "guard"},
            {"command": "assertScene", "scene": "gate"},
        ])));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message.contains("a choice among"));
    }

    #[test]
    fn navigation_errors_are_failures() {
        let mut headless = headless();
        let report = headless.run(&commands(json!([
            {"command": "talkTo", "hotspot": "guard"},
            {"command": "selectChoice", "choice": 5},
            {"command": "selectChoice", "choice": 2},
            {"command": "lookAt", "hotspot": "nobody"},
        ])));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(report.failures[0].message.contains("invalid choice 5"));
    }

    #[test]
    fn event_field_matching() {
        let event = GameEvent::FlagSet {
            name: "paid".into(),
            value: FlagValue::Bool(true),
        };
        let fields = |v: Value| v.as_object().cloned().unwrap();
        assert!(event_matches(&event, &Map::new()));
        assert!(event_matches(&event, &fields(json!({"name": "paid"}))));
        assert!(event_matches(&event, &fields(json!({"name": "paid", "value": true}))));
        assert!(!event_matches(&event, &fields(json!({"value": false}))));
        assert!(!event_matches(&event, &fields(json!({"missing": 1}))));
    }

    #[test]
    fn report_serialises() {
        let mut headless = headless();
        let report = headless.run(&[]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["passed"], json!(true));
        assert_eq!(value["events"][0], json!({"type": "game_start"}));
    }
}
