//! Game configuration.

use crate::narrator::prompts::DEFAULT_SYSTEM_CONTEXT;
use crate::narrator::NarratorConfig;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_LOCATION: &str = "Mistwood Tavern";
pub const DEFAULT_OPENING_SCENE: &str = "The mists of adventure swirl around you...";

/// Settings shared by the narrator and the game-state manager.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Where new games start.
    pub default_location: String,

    /// Scene shown before any narration exists.
    pub opening_scene: String,

    pub history_capacity: usize,

    pub search_results: usize,

    /// Events kept in a saved game's recent history.
    pub max_recent_events: usize,

    pub temperature: Option<f32>,

    pub system_context: String,

    pub save_dir: PathBuf,

    pub knowledge_base_dir: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_location: DEFAULT_LOCATION.to_string(),
            opening_scene: DEFAULT_OPENING_SCENE.to_string(),
            history_capacity: 10,
            search_results: 5,
            max_recent_events: 20,
            temperature: Some(0.7),
            system_context: DEFAULT_SYSTEM_CONTEXT.to_string(),
            save_dir: PathBuf::from("data/saves"),
            knowledge_base_dir: PathBuf::from("data/knowledge_base"),
        }
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `AETHERQUILL_*` environment variables, after
    /// loading a `.env` file if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    /// Values that do not parse are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("AETHERQUILL_SAVE_DIR") {
            config.save_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("AETHERQUILL_KNOWLEDGE_BASE") {
            config.knowledge_base_dir = PathBuf::from(dir);
        }
        if let Some(location) = lookup("AETHERQUILL_DEFAULT_LOCATION") {
            let location = location.trim();
            if !location.is_empty() {
                config.default_location = location.to_string();
            }
        }
        if let Some(raw) = lookup("AETHERQUILL_TEMPERATURE") {
            match raw.trim().parse::<f32>() {
                Ok(t) if (0.0..=2.0).contains(&t) => config.temperature = Some(t),
                _ => warn!(value = %raw, "Ignoring invalid AETHERQUILL_TEMPERATURE"),
            }
        }

        config
    }

    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_knowledge_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.knowledge_base_dir = dir.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_max_recent_events(mut self, max: usize) -> Self {
        self.max_recent_events = max;
        self
    }

    /// Narrator settings taken from this config.
    pub fn narrator_config(&self) -> NarratorConfig {
        NarratorConfig {
            temperature: self.temperature,
            system_context: self.system_context.clone(),
            history_capacity: self.history_capacity,
            search_results: self.search_results,
        }
    }
}
