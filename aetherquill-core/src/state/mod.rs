//! Narrative game state: the per-character record, its game-data bundle and
//! the manager that drives a game from bootstrap through play.
//!
//! Saved game data is decoded leniently. Each field falls back to its default
//! on its own, so a save written by an older build or damaged by hand still
//! loads with whatever it got right.

mod environment;
mod inventory;
mod manager;

pub use environment::environmental_effects;
pub use inventory::{inventory_or_starter_kit, parse_inventory, render_inventory, starter_kit};
pub use manager::{ActionOutcome, GameStateManager};

use crate::character::{Character, CharacterId, InventoryItem};
use crate::combat::{CombatError, InitiativeTracker};
use crate::persist::PersistError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from game-state operations that the caller must see.
#[derive(Debug, Error)]
pub enum GameStateError {
    #[error("No saved game for character {0}")]
    NoSavedGame(CharacterId),

    #[error("Combat is not active")]
    CombatNotActive,

    #[error("Action cannot be empty")]
    EmptyAction,

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Where a character's game stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamePhase {
    /// No saved record.
    New,
    /// Opening prompts are in flight.
    Bootstrapping,
    /// A scene exists and actions are accepted.
    Active,
}

// ============================================================================
// Actions
// ============================================================================

/// Something the player does in the current scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    Talk,
    Look,
    Search,
    Journal,
    Custom(String),
}

impl PlayerAction {
    /// Experience awarded for taking the action.
    pub fn experience(&self) -> u32 {
        match self {
            PlayerAction::Talk => 10,
            PlayerAction::Look => 5,
            PlayerAction::Search => 15,
            PlayerAction::Journal => 8,
            PlayerAction::Custom(_) => 20,
        }
    }

    /// The action as it reads after "attempts to".
    pub fn description(&self) -> &str {
        match self {
            PlayerAction::Talk => "talk to someone nearby",
            PlayerAction::Look => "look around carefully",
            PlayerAction::Search => "search the area",
            PlayerAction::Journal => "write in their journal",
            PlayerAction::Custom(text) => text.trim(),
        }
    }
}

// ============================================================================
// Combat sub-state
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantEntry {
    pub name: String,
    pub initiative: i32,
}

/// Combat as persisted with a game. Orthogonal to the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub active: bool,
    pub round: u32,
    /// Highest initiative first.
    pub combatants: Vec<CombatantEntry>,
}

impl CombatState {
    pub fn started() -> Self {
        Self {
            active: true,
            round: 1,
            combatants: Vec::new(),
        }
    }

    /// Add an entry, keeping initiative order stable for ties.
    pub fn add(&mut self, name: impl Into<String>, initiative: i32) -> Result<(), CombatError> {
        let name = name.into();
        if self.combatants.iter().any(|c| c.name == name) {
            return Err(CombatError::DuplicateName(name));
        }
        self.combatants.push(CombatantEntry { name, initiative });
        self.combatants.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        Ok(())
    }

    /// Snapshot of a live encounter.
    pub fn from_tracker(tracker: &InitiativeTracker) -> Self {
        Self {
            active: true,
            round: tracker.round(),
            combatants: tracker
                .combatants()
                .iter()
                .map(|c| CombatantEntry {
                    name: c.name.clone(),
                    initiative: c.initiative,
                })
                .collect(),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let combatants = obj
            .get("combatants")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|c| serde_json::from_value(c.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            active: obj.get("active").and_then(Value::as_bool).unwrap_or(false),
            round: obj
                .get("round")
                .and_then(Value::as_u64)
                .and_then(|r| u32::try_from(r).ok())
                .filter(|r| *r > 0)
                .unwrap_or(1),
            combatants,
        })
    }
}

// ============================================================================
// Game data
// ============================================================================

fn default_status() -> BTreeMap<String, i32> {
    BTreeMap::from([("health".to_string(), 100), ("energy".to_string(), 100)])
}

/// Run-time state of the character inside a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterState {
    pub inventory: Vec<InventoryItem>,
    pub status: BTreeMap<String, i32>,
    /// Snapshot taken at the last save.
    pub character: Option<Character>,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            inventory: Vec::new(),
            status: default_status(),
            character: None,
        }
    }
}

impl CharacterState {
    fn from_value(value: &Value) -> Self {
        let mut state = Self::default();
        let Some(obj) = value.as_object() else {
            return state;
        };

        if let Some(items) = obj.get("inventory").and_then(Value::as_array) {
            state.inventory = items
                .iter()
                .filter_map(|i| serde_json::from_value(i.clone()).ok())
                .collect();
        }
        if let Some(status) = obj.get("status").and_then(Value::as_object) {
            let parsed: BTreeMap<String, i32> = status
                .iter()
                .filter_map(|(k, v)| {
                    let n = v.as_i64().and_then(|n| i32::try_from(n).ok())?;
                    Some((k.clone(), n))
                })
                .collect();
            if !parsed.is_empty() {
                state.status = parsed;
            }
        }
        state.character = obj
            .get("character")
            .and_then(|c| serde_json::from_value(c.clone()).ok());
        state
    }
}

/// Everything saved with a scene apart from the scene text and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameData {
    pub timestamp: DateTime<Utc>,
    pub weather: String,
    pub environmental_effects: Vec<String>,
    pub active_quests: Vec<String>,
    /// Oldest first.
    pub recent_events: Vec<String>,
    pub character_data: CharacterState,
    pub combat_state: Option<CombatState>,
}

impl Default for GameData {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            weather: String::new(),
            environmental_effects: Vec::new(),
            active_quests: Vec::new(),
            recent_events: Vec::new(),
            character_data: CharacterState::default(),
            combat_state: None,
        }
    }
}

impl GameData {
    /// Fresh game data with effects derived from the weather.
    pub fn new(weather: impl Into<String>, inventory: Vec<InventoryItem>) -> Self {
        let weather = weather.into();
        Self {
            environmental_effects: environmental_effects(&weather),
            weather,
            character_data: CharacterState {
                inventory,
                ..CharacterState::default()
            },
            ..Self::default()
        }
    }

    pub fn combat_active(&self) -> bool {
        self.combat_state.as_ref().is_some_and(|c| c.active)
    }

    /// Append an event, dropping the oldest beyond `max`.
    pub fn push_event(&mut self, event: impl Into<String>, max: usize) {
        self.recent_events.push(event.into());
        let excess = self.recent_events.len().saturating_sub(max);
        self.recent_events.drain(..excess);
    }

    /// Decode a saved blob. Only invalid JSON is an error; a valid document
    /// of the wrong shape decodes to defaults.
    pub fn decode(blob: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(blob)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let mut data = Self::default();
        let Some(obj) = value.as_object() else {
            return data;
        };

        if let Some(ts) = obj
            .get("timestamp")
            .and_then(|t| serde_json::from_value::<DateTime<Utc>>(t.clone()).ok())
        {
            data.timestamp = ts;
        }
        if let Some(weather) = obj.get("weather").and_then(Value::as_str) {
            data.weather = weather.to_string();
        }
        data.environmental_effects = string_list(obj.get("environmental_effects"));
        data.active_quests = string_list(obj.get("active_quests"));
        data.recent_events = string_list(obj.get("recent_events"));
        if let Some(character) = obj.get("character_data") {
            data.character_data = CharacterState::from_value(character);
        }
        data.combat_state = obj.get("combat_state").and_then(CombatState::from_value);
        data
    }
}

impl<'de> Deserialize<'de> for GameData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// A loaded game: scene text, location and game data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub scene: String,
    pub location: String,
    pub game_data: GameData,
}
