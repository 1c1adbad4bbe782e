//! The mutable world state an interpreter reads and writes.

use std::collections::BTreeMap;

use fb_script::{Facts, FlagValue};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::event::GameEvent;

/// Flag name holding the number of the act in progress.
pub const CURRENT_ACT_FLAG: &str = "current_act";

/// Current scene, flags, inventory and history of one playthrough.
///
/// Mutators announce what changed on the attached [`EventBus`], if any. Bulk
/// setters (`set_flags`, `set_inventory`) are silent; they are meant for
/// seeding and for carrying state across acts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    current_scene: Option<String>,
    #[serde(default)]
    flags: BTreeMap<String, FlagValue>,
    #[serde(default)]
    inventory: IndexSet<String>,
    #[serde(default)]
    visited_scenes: Vec<String>,
    #[serde(default)]
    npc_states: BTreeMap<String, String>,
    #[serde(default)]
    variables: BTreeMap<String, FlagValue>,
    #[serde(skip)]
    bus: Option<EventBus>,
}

/// Immutable copy of inventory and flags, taken when an act completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Items held, in acquisition order.
    pub inventory: Vec<String>,
    /// All flags.
    pub flags: BTreeMap<String, FlagValue>,
}

impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.current_scene == other.current_scene
            && self.flags == other.flags
            && self.inventory == other.inventory
            && self.visited_scenes == other.visited_scenes
            && self.npc_states == other.npc_states
            && self.variables == other.variables
    }
}

impl GameState {
    /// An empty state with no bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce future changes on `bus`.
    pub fn attach_bus(&mut self, bus: EventBus) {
        self.bus = Some(bus);
    }

    /// Stop announcing changes.
    pub fn detach_bus(&mut self) -> Option<EventBus> {
        self.bus.take()
    }

    fn emit(&self, event: GameEvent) {
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }

    // -- Scene --

    /// The scene the player is in.
    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }

    /// Move the player to a scene.
    ///
    /// Announces leaving the previous scene (when it differs) and entering
    /// this one, and records the visit.
    pub fn set_current_scene(&mut self, scene: impl Into<String>) {
        let scene = scene.into();
        if let Some(previous) = self.current_scene.take() {
            if previous != scene {
                self.emit(GameEvent::SceneExit { scene: previous });
            }
        }
        if !self.visited_scenes.contains(&scene) {
            self.visited_scenes.push(scene.clone());
        }
        self.current_scene = Some(scene.clone());
        self.emit(GameEvent::SceneEnter { scene });
    }

    /// Scenes entered so far, each listed once, in first-visit order.
    pub fn visited_scenes(&self) -> &[String] {
        &self.visited_scenes
    }

    /// Whether the player has ever entered a scene.
    pub fn has_visited(&self, scene: &str) -> bool {
        self.visited_scenes.iter().any(|s| s == scene)
    }

    // -- Flags --

    /// Value of a flag.
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// Whether a flag is set to a truthy value. Missing flags are false.
    pub fn is_set(&self, name: &str) -> bool {
        self.flags.get(name).is_some_and(FlagValue::is_truthy)
    }

    /// Write a flag and announce it.
    pub fn set_flag(&mut self, name: impl Into<String>, value: impl Into<FlagValue>) {
        let name = name.into();
        let value = value.into();
        self.flags.insert(name.clone(), value.clone());
        self.emit(GameEvent::FlagSet { name, value });
    }

    /// All flags.
    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// Replace all flags without announcing anything.
    pub fn set_flags(&mut self, flags: BTreeMap<String, FlagValue>) {
        self.flags = flags;
    }

    /// The act number stored in the `current_act` flag, 1 when unset.
    pub fn current_act(&self) -> i64 {
        self.flags
            .get(CURRENT_ACT_FLAG)
            .and_then(FlagValue::as_number)
            .map_or(1, |n| n as i64)
    }

    // -- Inventory --

    /// Items held, in acquisition order.
    pub fn inventory(&self) -> &IndexSet<String> {
        &self.inventory
    }

    /// Whether an item is held.
    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.contains(item)
    }

    /// Add an item. Returns `true` and announces it only when it was not
    /// already held.
    pub fn add_item(&mut self, item: impl Into<String>) -> bool {
        let item = item.into();
        if !self.inventory.insert(item.clone()) {
            return false;
        }
        self.emit(GameEvent::InventoryAdd { item });
        true
    }

    /// Remove an item. Returns `true` and announces it only when it was held.
    pub fn remove_item(&mut self, item: &str) -> bool {
        if !self.inventory.shift_remove(item) {
            return false;
        }
        self.emit(GameEvent::InventoryRemove {
            item: item.to_string(),
        });
        true
    }

    /// Replace the inventory without announcing anything.
    pub fn set_inventory<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inventory = items.into_iter().map(Into::into).collect();
    }

    // -- NPCs and variables --

    /// Recorded state of an NPC.
    pub fn npc_state(&self, npc: &str) -> Option<&str> {
        self.npc_states.get(npc).map(String::as_str)
    }

    /// Record the state of an NPC.
    pub fn set_npc_state(&mut self, npc: impl Into<String>, state: impl Into<String>) {
        self.npc_states.insert(npc.into(), state.into());
    }

    /// A host-side variable. Variables never appear in conditions.
    pub fn variable(&self, name: &str) -> Option<&FlagValue> {
        self.variables.get(name)
    }

    /// Set a host-side variable.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<FlagValue>) {
        self.variables.insert(name.into(), value.into());
    }

    // -- Snapshots and persistence --

    /// Copy inventory and flags.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            inventory: self.inventory.iter().cloned().collect(),
            flags: self.flags.clone(),
        }
    }

    /// Copy everything except the bus into `target`, keeping its bus.
    pub fn carry_into(&self, target: &mut GameState) {
        let bus = target.bus.take();
        *target = Self {
            bus,
            ..self.clone_detached()
        };
    }

    fn clone_detached(&self) -> Self {
        Self {
            current_scene: self.current_scene.clone(),
            flags: self.flags.clone(),
            inventory: self.inventory.clone(),
            visited_scenes: self.visited_scenes.clone(),
            npc_states: self.npc_states.clone(),
            variables: self.variables.clone(),
            bus: None,
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialise from JSON. The result has no bus attached.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Facts for GameState {
    fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    fn has_item(&self, item: &str) -> bool {
        self.inventory.contains(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use proptest::prelude::*;

    fn logged() -> (GameState, EventBus) {
        let bus = EventBus::with_log();
        let mut state = GameState::new();
        state.attach_bus(bus.clone());
        (state, bus)
    }

    #[test]
    fn add_item_announces_once() {
        let (mut state, bus) = logged();
        assert!(state.add_item("key"));
        assert!(!state.add_item("key"));
        assert_eq!(bus.events_of(EventKind::InventoryAdd).len(), 1);
        assert_eq!(state.inventory().len(), 1);
    }

    #[test]
    fn remove_missing_item_is_silent() {
        let (mut state, bus) = logged();
        assert!(!state.remove_item("key"));
        assert!(bus.events().is_empty());

        state.add_item("key");
        assert!(state.remove_item("key"));
        assert!(!state.has_item("key"));
        assert_eq!(bus.events_of(EventKind::InventoryRemove).len(), 1);
    }

    #[test]
    fn scene_change_announces_exit_and_enter() {
        let (mut state, bus) = logged();
        state.set_current_scene("hall");
        state.set_current_scene("cellar");
        state.set_current_scene("hall");

        let kinds: Vec<_> = bus.events().iter().map(GameEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::SceneEnter,
                EventKind::SceneExit,
                EventKind::SceneEnter,
                EventKind::SceneExit,
                EventKind::SceneEnter,
            ]
        );
        assert_eq!(state.visited_scenes(), ["hall", "cellar"]);
        assert!(state.has_visited("cellar"));
    }

    #[test]
    fn bulk_setters_are_silent() {
        let (mut state, bus) = logged();
        state.set_inventory(["a", "b"]);
        state.set_flags(BTreeMap::from([("x".to_string(), FlagValue::Bool(true))]));
        assert!(bus.events().is_empty());
        assert!(state.has_item("b"));
        assert!(state.is_set("x"));
    }

    #[test]
    fn current_act_defaults_to_one() {
        let mut state = GameState::new();
        assert_eq!(state.current_act(), 1);
        state.set_flag(CURRENT_ACT_FLAG, 3i64);
        assert_eq!(state.current_act(), 3);
        state.set_flag(CURRENT_ACT_FLAG, "2");
        assert_eq!(state.current_act(), 2);
    }

    #[test]
    fn json_preserves_everything_but_the_bus() {
        let (mut state, _bus) = logged();
        state.set_current_scene("hall");
        state.set_flag("door_open", true);
        state.set_flag("coins", 12i64);
        state.set_flag("mood", "grim");
        state.add_item("lamp");
        state.add_item("key");
        state.set_npc_state("guard", "asleep");
        state.set_variable("steps", 40i64);

        let json = state.to_json().unwrap();
        let restored = GameState::from_json(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(
            restored.inventory().iter().collect::<Vec<_>>(),
            vec!["lamp", "key"]
        );
        assert!(restored.bus.is_none());
    }

    #[test]
    fn from_json_tolerates_missing_fields() {
        let state = GameState::from_json(r#"{"flags": {"a": true}}"#).unwrap();
        assert!(state.is_set("a"));
        assert!(state.current_scene().is_none());
    }

    #[test]
    fn carry_into_keeps_target_bus() {
        let (mut target, bus) = logged();
        let mut source = GameState::new();
        source.add_item("map");
        source.set_flag("met_guard", true);

        source.carry_into(&mut target);
        assert!(target.has_item("map"));
        target.add_item("coin");
        assert_eq!(bus.events_of(EventKind::InventoryAdd).len(), 1);
    }

    proptest! {
        #[test]
        fn inventory_is_a_set(items in prop::collection::vec("[a-c]", 0..20)) {
            let (mut state, bus) = logged();
            for item in &items {
                state.add_item(item.as_str());
            }
            let mut unique = items.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(state.inventory().len(), unique.len());
            prop_assert_eq!(bus.events_of(EventKind::InventoryAdd).len(), unique.len());
        }

        #[test]
        fn add_then_remove_leaves_item_absent(item in "[a-z]{1,8}", repeats in 1usize..4) {
            let mut state = GameState::new();
            for _ in 0..repeats {
                state.add_item(item.as_str());
            }
            state.remove_item(&item);
            prop_assert!(!state.has_item(&item));
        }
    }
}
