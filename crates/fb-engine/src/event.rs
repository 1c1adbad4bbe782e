//! Events emitted while a story plays.

use std::collections::BTreeMap;
use std::fmt;

use fb_script::FlagValue;
use serde::{Deserialize, Serialize};

/// Something that happened during play, as seen by a consumer.
///
/// Serialised with a `type` discriminator and the variant's fields alongside
/// it, e.g. `{"type":"inventory_add","item":"key"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The runner started.
    GameStart,
    /// The story reached a terminal point.
    GameEnd {
        /// The sentinel that ended it, or `complete` when the last act ended.
        ending: String,
    },
    /// An act's content was loaded and is about to be entered.
    ActStart {
        /// 1-based act number.
        act: usize,
        /// Scene the act starts in.
        scene: Option<String>,
    },
    /// `ACT_END` was reached.
    ActComplete {
        /// Value of the `current_act` flag (1 when unset).
        act: i64,
        /// Inventory at the moment the act ended.
        inventory: Vec<String>,
        /// Flags at the moment the act ended.
        flags: BTreeMap<String, FlagValue>,
    },
    /// The player entered a scene.
    SceneEnter {
        /// Scene id.
        scene: String,
    },
    /// The player left a scene.
    SceneExit {
        /// Scene id.
        scene: String,
    },
    /// A DIALOGUE definition started running.
    DialogueStart {
        /// Dialogue id.
        dialogue: String,
    },
    /// A spoken or narrated line waiting to be shown.
    DialogueLine {
        /// Speaker, absent for narration.
        speaker: Option<String>,
        /// Line text.
        text: String,
        /// Whether the line is an inner thought.
        thinks: bool,
    },
    /// A CHOICE prompt waiting for a selection.
    DialogueChoice {
        /// Option texts, selected 1-indexed.
        options: Vec<String>,
    },
    /// A DIALOGUE definition finished.
    DialogueEnd {
        /// Dialogue id.
        dialogue: String,
    },
    /// An item entered the inventory.
    InventoryAdd {
        /// Item id.
        item: String,
    },
    /// An item left the inventory.
    InventoryRemove {
        /// Item id.
        item: String,
    },
    /// A flag was written.
    FlagSet {
        /// Flag name.
        name: String,
        /// New value.
        value: FlagValue,
    },
    /// A trigger's requirements held and it ran.
    TriggerExecute {
        /// Trigger id.
        trigger: String,
    },
    /// A trigger's cutscene started.
    CutsceneStart {
        /// Trigger id.
        trigger: String,
    },
    /// A cutscene line (never waits for the player).
    CutsceneLine {
        /// Speaker, absent for narration.
        speaker: Option<String>,
        /// Line text.
        text: String,
        /// Whether the line is an inner thought.
        thinks: bool,
    },
    /// A trigger's cutscene finished.
    CutsceneEnd {
        /// Trigger id.
        trigger: String,
    },
}

/// The discriminator of a [`GameEvent`], used for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`GameEvent::GameStart`].
    GameStart,
    /// [`GameEvent::GameEnd`].
    GameEnd,
    /// [`GameEvent::ActStart`].
    ActStart,
    /// [`GameEvent::ActComplete`].
    ActComplete,
    /// [`GameEvent::SceneEnter`].
    SceneEnter,
    /// [`GameEvent::SceneExit`].
    SceneExit,
    /// [`GameEvent::DialogueStart`].
    DialogueStart,
    /// [`GameEvent::DialogueLine`].
    DialogueLine,
    /// [`GameEvent::DialogueChoice`].
    DialogueChoice,
    /// [`GameEvent::DialogueEnd`].
    DialogueEnd,
    /// [`GameEvent::InventoryAdd`].
    InventoryAdd,
    /// [`GameEvent::InventoryRemove`].
    InventoryRemove,
    /// [`GameEvent::FlagSet`].
    FlagSet,
    /// [`GameEvent::TriggerExecute`].
    TriggerExecute,
    /// [`GameEvent::CutsceneStart`].
    CutsceneStart,
    /// [`GameEvent::CutsceneLine`].
    CutsceneLine,
    /// [`GameEvent::CutsceneEnd`].
    CutsceneEnd,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 17] = [
        Self::GameStart,
        Self::GameEnd,
        Self::ActStart,
        Self::ActComplete,
        Self::SceneEnter,
        Self::SceneExit,
        Self::DialogueStart,
        Self::DialogueLine,
        Self::DialogueChoice,
        Self::DialogueEnd,
        Self::InventoryAdd,
        Self::InventoryRemove,
        Self::FlagSet,
        Self::TriggerExecute,
        Self::CutsceneStart,
        Self::CutsceneLine,
        Self::CutsceneEnd,
    ];

    /// The `type` string used in serialised events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GameStart => "game_start",
            Self::GameEnd => "game_end",
            Self::ActStart => "act_start",
            Self::ActComplete => "act_complete",
            Self::SceneEnter => "scene_enter",
            Self::SceneExit => "scene_exit",
            Self::DialogueStart => "dialogue_start",
            Self::DialogueLine => "dialogue_line",
            Self::DialogueChoice => "dialogue_choice",
            Self::DialogueEnd => "dialogue_end",
            Self::InventoryAdd => "inventory_add",
            Self::InventoryRemove => "inventory_remove",
            Self::FlagSet => "flag_set",
            Self::TriggerExecute => "trigger_execute",
            Self::CutsceneStart => "cutscene_start",
            Self::CutsceneLine => "cutscene_line",
            Self::CutsceneEnd => "cutscene_end",
        }
    }

    /// Parse a `type` string. Accepts `snake_case` and `camelCase` spellings.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .flat_map(|c| {
                if c.is_ascii_uppercase() {
                    vec!['_', c.to_ascii_lowercase()]
                } else {
                    vec![c]
                }
            })
            .collect();
        Self::ALL.into_iter().find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GameEvent {
    /// The discriminator of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GameStart => EventKind::GameStart,
            Self::GameEnd { .. } => EventKind::GameEnd,
            Self::ActStart { .. } => EventKind::ActStart,
            Self::ActComplete { .. } => EventKind::ActComplete,
            Self::SceneEnter { .. } => EventKind::SceneEnter,
            Self::SceneExit { .. } => EventKind::SceneExit,
            Self::DialogueStart { .. } => EventKind::DialogueStart,
            Self::DialogueLine { .. } => EventKind::DialogueLine,
            Self::DialogueChoice { .. } => EventKind::DialogueChoice,
            Self::DialogueEnd { .. } => EventKind::DialogueEnd,
            Self::InventoryAdd { .. } => EventKind::InventoryAdd,
            Self::InventoryRemove { .. } => EventKind::InventoryRemove,
            Self::FlagSet { .. } => EventKind::FlagSet,
            Self::TriggerExecute { .. } => EventKind::TriggerExecute,
            Self::CutsceneStart { .. } => EventKind::CutsceneStart,
            Self::CutsceneLine { .. } => EventKind::CutsceneLine,
            Self::CutsceneEnd { .. } => EventKind::CutsceneEnd,
        }
    }
}
