//! Text-adventure RPG core with an AI Game Master.
//!
//! This crate provides:
//! - Initiative-ordered combat with timed status effects
//! - Point-buy character creation, derived stats and levelling
//! - An AI narrator with conversation history and knowledge-base context
//! - Per-character save state with lenient loading
//!
//! Presentation is left to the caller. Every operation takes the character
//! and the narrative service it works with as arguments.
//!
//! # Quick Start
//!
//! ```ignore
//! use aetherquill_core::{
//!     GameConfig, GameStateManager, JsonFileStore, Narrator, PlayerAction,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = GameConfig::from_env();
//!     let narrator = Narrator::new(my_completion_service, config.narrator_config());
//!     let manager = GameStateManager::new(JsonFileStore::new(&config.save_dir), config);
//!
//!     let record = manager.create_new_game(&hero, &narrator).await;
//!     println!("{}", record.scene);
//!
//!     let outcome = manager
//!         .submit_action(&mut hero, &PlayerAction::Look, &narrator)
//!         .await?;
//!     println!("{}", outcome.narrative);
//! }
//! ```

pub mod character;
pub mod character_builder;
pub mod combat;
pub mod config;
pub mod dice;
pub mod narrator;
pub mod persist;
pub mod state;
pub mod testing;

// Primary public API
pub use character::{
    Ability, AbilityScores, Background, Character, CharacterClass, CharacterId, DerivedStats,
    InventoryItem, Race, Skill,
};
pub use character_builder::{finalize_character, CharacterBuilder, CharacterDraft, CreationError};
pub use combat::{AttackReport, CombatError, Combatant, EffectKind, InitiativeTracker, StatusEffect};
pub use config::GameConfig;
pub use dice::{DiceError, DiceExpression, DieType, RollResult};
pub use narrator::{
    AiResponse, CompletionError, NarrativeService, Narrator, NarratorConfig, TextCompletion,
};
pub use persist::{GameStateStore, InMemoryStore, JsonFileStore, PersistError};
pub use state::{
    ActionOutcome, CombatState, GameData, GamePhase, GameRecord, GameStateError,
    GameStateManager, PlayerAction,
};
