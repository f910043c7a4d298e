//! Orchestration of narrative prompts and saved game state.

use super::inventory::{inventory_or_starter_kit, starter_kit};
use super::{CombatState, GameData, GamePhase, GameRecord, GameStateError, PlayerAction};
use crate::character::{Character, CharacterId};
use crate::combat::InitiativeTracker;
use crate::config::GameConfig;
use crate::narrator::prompts;
use crate::narrator::NarrativeService;
use crate::persist::{GameStateStore, PersistError, StoredRecord};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

const DEFAULT_WEATHER: &str = "Clear skies";
const SCENE_FAILURE: &str = "You find yourself in a mysterious place...";
const SCENE_EMPTY: &str = "The scene slowly comes into focus...";

/// Result of a submitted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub narrative: String,
    pub xp_awarded: u32,
    pub levels_gained: u32,
}

/// Builds prompts for each kind of interaction and keeps one saved record
/// per character in a [`GameStateStore`].
///
/// The character and the narrative service are passed to every call; the
/// manager holds no notion of a current player.
pub struct GameStateManager<S> {
    store: S,
    config: GameConfig,
    bootstrapping: Mutex<HashSet<CharacterId>>,
}

impl<S: GameStateStore> GameStateManager<S> {
    pub fn new(store: S, config: GameConfig) -> Self {
        Self {
            store,
            config,
            bootstrapping: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub async fn phase(&self, char_id: &CharacterId) -> GamePhase {
        if lock_ids(&self.bootstrapping).contains(char_id) {
            return GamePhase::Bootstrapping;
        }
        match self.store.fetch(char_id).await {
            Ok(Some(_)) => GamePhase::Active,
            Ok(None) => GamePhase::New,
            Err(e) => {
                warn!(char_id = %char_id, error = %e, "Could not read saved game");
                GamePhase::New
            }
        }
    }

    // ========================================================================
    // Bootstrap
    // ========================================================================

    /// Start a game: ask for weather, then starting gear, then an opening
    /// scene, and save the result.
    ///
    /// Every prompt has a fallback, so this always produces a record. A
    /// failed save is logged and the record is still returned. The game
    /// reports [`GamePhase::Bootstrapping`] until this finishes or the future
    /// is dropped.
    pub async fn create_new_game<N>(&self, character: &Character, narrator: &N) -> GameRecord
    where
        N: NarrativeService + ?Sized,
    {
        let char_id = character.id;
        let bootstrap = BootstrapGuard::enter(&self.bootstrapping, char_id);
        let location = self.config.default_location.clone();

        let weather = narrator
            .generate(&prompts::weather_prompt(character, &location), None)
            .await
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_WEATHER.to_string());

        let inventory = match narrator
            .generate(&prompts::inventory_prompt(character), None)
            .await
            .text()
        {
            Some(text) => inventory_or_starter_kit(text),
            None => starter_kit(),
        };

        let scene = narrator
            .generate(
                &prompts::opening_scene_prompt(character, &location, &weather),
                None,
            )
            .await
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.opening_scene.clone());

        let mut game_data = GameData::new(weather, inventory);
        game_data.character_data.character = Some(character.clone());

        if let Err(e) = self
            .save_game_state(&char_id, &scene, &location, &game_data)
            .await
        {
            warn!(char_id = %char_id, error = %e, "Failed to save new game");
        }
        drop(bootstrap);

        info!(
            char_id = %char_id,
            name = %character.name,
            weather = %game_data.weather,
            items = game_data.character_data.inventory.len(),
            "New game created"
        );

        GameRecord {
            scene,
            location,
            game_data,
        }
    }

    // ========================================================================
    // Narration
    // ========================================================================

    /// Describe the character's surroundings at `location`.
    pub async fn generate_scene_description<N>(
        &self,
        character: &Character,
        location: &str,
        narrator: &N,
    ) -> String
    where
        N: NarrativeService + ?Sized,
    {
        let data = self
            .load_game_state(&character.id)
            .await
            .map(|r| r.game_data)
            .unwrap_or_default();
        let prompt = prompts::scene_prompt(
            character,
            location,
            weather_or_default(&data),
            &data.recent_events,
        );

        let response = narrator.generate(&prompt, None).await;
        if !response.success {
            return SCENE_FAILURE.to_string();
        }
        match response.text() {
            Some(text) => text.to_string(),
            None => SCENE_EMPTY.to_string(),
        }
    }

    /// Narrate the outcome of `action` in the character's saved scene.
    pub async fn generate_action_response<N>(
        &self,
        character: &Character,
        action: &str,
        narrator: &N,
    ) -> String
    where
        N: NarrativeService + ?Sized,
    {
        let record = self.load_game_state(&character.id).await;
        self.respond(character, action, record.as_ref(), narrator).await
    }

    async fn respond<N>(
        &self,
        character: &Character,
        action: &str,
        record: Option<&GameRecord>,
        narrator: &N,
    ) -> String
    where
        N: NarrativeService + ?Sized,
    {
        let action = action.trim();
        let prompt = match record {
            Some(r) => prompts::action_prompt(
                character,
                action,
                &r.scene,
                &r.location,
                weather_or_default(&r.game_data),
                &r.game_data.recent_events,
            ),
            None => prompts::action_prompt(
                character,
                action,
                &self.config.opening_scene,
                &self.config.default_location,
                DEFAULT_WEATHER,
                &[],
            ),
        };

        let response = narrator.generate(&prompt, None).await;
        if !response.success {
            debug!(action, "Using fallback action response");
            return format!("You attempt to {action}...");
        }
        match response.text() {
            Some(text) => text.to_string(),
            None => format!("You attempt to {action}, but something seems amiss..."),
        }
    }

    /// Take an action in an active game: narrate it, award experience, record
    /// the event and save the new scene.
    pub async fn submit_action<N>(
        &self,
        character: &mut Character,
        action: &PlayerAction,
        narrator: &N,
    ) -> Result<ActionOutcome, GameStateError>
    where
        N: NarrativeService + ?Sized,
    {
        let text = action.description();
        if text.is_empty() {
            return Err(GameStateError::EmptyAction);
        }

        let char_id = character.id;
        let record = self
            .load_game_state(&char_id)
            .await
            .ok_or(GameStateError::NoSavedGame(char_id))?;

        let narrative = self.respond(character, text, Some(&record), narrator).await;

        // the caller's character only changes once the save has gone through
        let mut updated = character.clone();
        let xp_awarded = action.experience();
        let levels_gained = updated.add_experience(xp_awarded);

        let mut game_data = record.game_data;
        game_data.push_event(
            format!("{} attempts to {text}", updated.name),
            self.config.max_recent_events,
        );
        game_data.character_data.character = Some(updated.clone());
        game_data.timestamp = Utc::now();

        self.save_game_state(&char_id, &narrative, &record.location, &game_data)
            .await?;
        *character = updated;

        if levels_gained > 0 {
            info!(
                char_id = %char_id,
                level = character.level,
                "Character levelled up"
            );
        }

        Ok(ActionOutcome {
            narrative,
            xp_awarded,
            levels_gained,
        })
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save a record, replacing any earlier one for the character.
    pub async fn save_game_state(
        &self,
        char_id: &CharacterId,
        scene: &str,
        location: &str,
        game_data: &GameData,
    ) -> Result<(), PersistError> {
        let blob = serde_json::to_string(game_data)?;
        self.store
            .upsert(StoredRecord::new(*char_id, scene, location, blob))
            .await?;
        debug!(char_id = %char_id, location, "Game state saved");
        Ok(())
    }

    /// The saved record, or `None` when there is none or it cannot be read.
    ///
    /// A blank scene or location is replaced with the configured default.
    pub async fn load_game_state(&self, char_id: &CharacterId) -> Option<GameRecord> {
        let stored = match self.store.fetch(char_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!(char_id = %char_id, error = %e, "Failed to load game state");
                return None;
            }
        };

        let game_data = match GameData::decode(&stored.game_data) {
            Ok(data) => data,
            Err(e) => {
                warn!(char_id = %char_id, error = %e, "Malformed game data in save");
                return None;
            }
        };

        let scene = if stored.scene.trim().is_empty() {
            self.config.opening_scene.clone()
        } else {
            stored.scene
        };
        let location = if stored.location.trim().is_empty() {
            self.config.default_location.clone()
        } else {
            stored.location
        };

        Some(GameRecord {
            scene,
            location,
            game_data,
        })
    }

    // ========================================================================
    // Combat sub-state
    // ========================================================================

    /// Begin combat, replacing any earlier combat state.
    pub async fn start_combat(&self, char_id: &CharacterId) -> Result<CombatState, GameStateError> {
        let result = self
            .update_combat(char_id, false, |data| {
                data.combat_state = Some(CombatState::started());
                Ok(())
            })
            .await;
        if result.is_ok() {
            info!(char_id = %char_id, "Combat started");
        }
        result
    }

    pub async fn add_combatant(
        &self,
        char_id: &CharacterId,
        name: &str,
        initiative: i32,
    ) -> Result<CombatState, GameStateError> {
        self.update_combat(char_id, true, |data| {
            if let Some(combat) = data.combat_state.as_mut() {
                combat.add(name, initiative)?;
            }
            Ok(())
        })
        .await
    }

    /// Copy a live tracker's round and turn order into the saved combat state.
    pub async fn sync_combat(
        &self,
        char_id: &CharacterId,
        tracker: &InitiativeTracker,
    ) -> Result<CombatState, GameStateError> {
        self.update_combat(char_id, true, |data| {
            data.combat_state = Some(CombatState::from_tracker(tracker));
            Ok(())
        })
        .await
    }

    /// End combat. Returns the final state, marked inactive.
    pub async fn end_combat(&self, char_id: &CharacterId) -> Result<CombatState, GameStateError> {
        let result = self
            .update_combat(char_id, true, |data| {
                if let Some(combat) = data.combat_state.as_mut() {
                    combat.active = false;
                }
                Ok(())
            })
            .await;
        if result.is_ok() {
            info!(char_id = %char_id, "Combat ended");
        }
        result
    }

    /// Load, mutate and save the combat sub-state. Failures are logged and
    /// returned; nothing is saved when the update fails.
    async fn update_combat<F>(
        &self,
        char_id: &CharacterId,
        require_active: bool,
        update: F,
    ) -> Result<CombatState, GameStateError>
    where
        F: FnOnce(&mut GameData) -> Result<(), GameStateError>,
    {
        let result = self.try_update_combat(char_id, require_active, update).await;
        if let Err(e) = &result {
            warn!(char_id = %char_id, error = %e, "Combat update skipped");
        }
        result
    }

    async fn try_update_combat<F>(
        &self,
        char_id: &CharacterId,
        require_active: bool,
        update: F,
    ) -> Result<CombatState, GameStateError>
    where
        F: FnOnce(&mut GameData) -> Result<(), GameStateError>,
    {
        let mut record = self
            .load_game_state(char_id)
            .await
            .ok_or(GameStateError::NoSavedGame(*char_id))?;
        if require_active && !record.game_data.combat_active() {
            return Err(GameStateError::CombatNotActive);
        }

        update(&mut record.game_data)?;
        let combat = record
            .game_data
            .combat_state
            .clone()
            .ok_or(GameStateError::CombatNotActive)?;

        self.save_game_state(char_id, &record.scene, &record.location, &record.game_data)
            .await?;
        Ok(combat)
    }
}

/// Marks a character as bootstrapping for as long as it lives.
struct BootstrapGuard<'a> {
    ids: &'a Mutex<HashSet<CharacterId>>,
    char_id: CharacterId,
}

impl<'a> BootstrapGuard<'a> {
    fn enter(ids: &'a Mutex<HashSet<CharacterId>>, char_id: CharacterId) -> Self {
        lock_ids(ids).insert(char_id);
        Self { ids, char_id }
    }
}

impl Drop for BootstrapGuard<'_> {
    fn drop(&mut self) {
        lock_ids(self.ids).remove(&self.char_id);
    }
}

// the set stays consistent even if a holder panicked
fn lock_ids(ids: &Mutex<HashSet<CharacterId>>) -> MutexGuard<'_, HashSet<CharacterId>> {
    ids.lock().unwrap_or_else(PoisonError::into_inner)
}

fn weather_or_default(data: &GameData) -> &str {
    if data.weather.trim().is_empty() {
        DEFAULT_WEATHER
    } else {
        &data.weather
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrator::{AiResponse, Narrator, NarratorConfig};
    use crate::persist::InMemoryStore;
    use crate::testing::{sample_character, FailingCompletion, MockCompletion};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn manager() -> GameStateManager<InMemoryStore> {
        GameStateManager::new(InMemoryStore::new(), GameConfig::default())
    }

    fn narrator(responses: &[&str]) -> Narrator<MockCompletion> {
        Narrator::new(
            MockCompletion::new(responses.iter().copied()),
            NarratorConfig::default(),
        )
    }

    /// Succeeds with blank content, which the narrator never does.
    struct BlankService;

    #[async_trait]
    impl NarrativeService for BlankService {
        async fn generate(&self, _prompt: &str, _context: Option<&str>) -> AiResponse {
            AiResponse::success("   ")
        }
    }

    /// Never answers.
    struct StalledService;

    #[async_trait]
    impl NarrativeService for StalledService {
        async fn generate(&self, _prompt: &str, _context: Option<&str>) -> AiResponse {
            std::future::pending().await
        }
    }

    /// In-memory store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl GameStateStore for FlakyStore {
        async fn upsert(&self, record: StoredRecord) -> Result<(), PersistError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PersistError::Io(std::io::Error::other("disk full")));
            }
            self.inner.upsert(record).await
        }

        async fn fetch(
            &self,
            char_id: &CharacterId,
        ) -> Result<Option<StoredRecord>, PersistError> {
            self.inner.fetch(char_id).await
        }

        async fn delete(&self, char_id: &CharacterId) -> Result<bool, PersistError> {
            self.inner.delete(char_id).await
        }

        async fn list(&self) -> Result<Vec<CharacterId>, PersistError> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_create_new_game() {
        let manager = manager();
        let hero = sample_character("Thalia");
        let narrator = narrator(&[
            "A cold wind carries light snow.",
            "- Longsword (1)\n- Healing Potion (2): smells of mint\n- Rope (1)",
            "The tavern door creaks open.",
        ]);

        assert_eq!(manager.phase(&hero.id).await, GamePhase::New);
        let record = manager.create_new_game(&hero, &narrator).await;
        assert_eq!(manager.phase(&hero.id).await, GamePhase::Active);

        assert_eq!(record.location, "Mistwood Tavern");
        assert_eq!(record.scene, "The tavern door creaks open.");
        assert_eq!(
            record.game_data.environmental_effects,
            ["breeze", "cold", "slippery"]
        );
        let inventory = &record.game_data.character_data.inventory;
        assert_eq!(inventory.len(), 3);
        assert_eq!(inventory[1].quantity, 2);

        let prompts = narrator.completion().prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("Weather: A cold wind carries light snow."));

        let loaded = manager.load_game_state(&hero.id).await.unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_dropped_bootstrap_clears_phase() {
        let manager = manager();
        let hero = sample_character("Thalia");

        {
            let create = manager.create_new_game(&hero, &StalledService);
            tokio::pin!(create);
            tokio::select! {
                biased;
                _ = &mut create => panic!("a stalled narrator cannot finish bootstrapping"),
                _ = std::future::ready(()) => {}
            }
            assert_eq!(manager.phase(&hero.id).await, GamePhase::Bootstrapping);
        }

        assert_eq!(manager.phase(&hero.id).await, GamePhase::New);
        assert!(manager.load_game_state(&hero.id).await.is_none());
    }

    #[tokio::test]
    async fn test_create_new_game_fallbacks() {
        let manager = manager();
        let hero = sample_character("Thalia");
        let narrator = Narrator::new(FailingCompletion::timeout(), NarratorConfig::default());

        let record = manager.create_new_game(&hero, &narrator).await;
        assert_eq!(record.game_data.weather, "Clear skies");
        assert_eq!(record.game_data.environmental_effects, ["good visibility"]);
        assert_eq!(record.game_data.character_data.inventory, starter_kit());
        assert_eq!(record.scene, "The mists of adventure swirl around you...");
    }

    #[tokio::test]
    async fn test_unparseable_inventory_uses_starter_kit() {
        let manager = manager();
        let hero = sample_character("Thalia");
        let narrator = narrator(&["Fog.", "You carry nothing of note.", "Scene."]);

        let record = manager.create_new_game(&hero, &narrator).await;
        assert_eq!(record.game_data.character_data.inventory, starter_kit());
    }

    #[tokio::test]
    async fn test_action_response_fallbacks() {
        let manager = manager();
        let hero = sample_character("Thalia");

        let failing = Narrator::new(FailingCompletion::connection(), NarratorConfig::default());
        assert_eq!(
            manager.generate_action_response(&hero, "open the door", &failing).await,
            "You attempt to open the door..."
        );
        assert_eq!(
            manager.generate_action_response(&hero, "open the door", &BlankService).await,
            "You attempt to open the door, but something seems amiss..."
        );
        assert_eq!(
            manager.generate_scene_description(&hero, "Keep", &failing).await,
            SCENE_FAILURE
        );
        assert_eq!(
            manager.generate_scene_description(&hero, "Keep", &BlankService).await,
            SCENE_EMPTY
        );
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let manager = manager();
        let id = CharacterId::new();
        let data = GameData::new("rain", starter_kit());

        manager.save_game_state(&id, "first", "Old Road", &data).await.unwrap();
        manager.save_game_state(&id, "second", "Old Road", &data).await.unwrap();

        let record = manager.load_game_state(&id).await.unwrap();
        assert_eq!(record.scene, "second");
        assert_eq!(record.game_data, data);
    }

    #[tokio::test]
    async fn test_load_missing_and_malformed() {
        let manager = manager();
        let id = CharacterId::new();
        assert!(manager.load_game_state(&id).await.is_none());

        manager
            .store()
            .upsert(StoredRecord::new(id, "scene", "place", "{broken"))
            .await
            .unwrap();
        assert!(manager.load_game_state(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_load_defaults_blank_scene_and_location() {
        let manager = manager();
        let id = CharacterId::new();
        manager
            .store()
            .upsert(StoredRecord::new(id, "  ", "", "\"just a string\""))
            .await
            .unwrap();

        let record = manager.load_game_state(&id).await.unwrap();
        assert_eq!(record.scene, manager.config().opening_scene);
        assert_eq!(record.location, "Mistwood Tavern");
        assert_eq!(record.game_data.character_data.status["energy"], 100);
    }

    #[tokio::test]
    async fn test_load_defaults_null_scene_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = crate::persist::JsonFileStore::new(dir.path());
        let id = CharacterId::new();
        let stored = StoredRecord::new(id, "unused", "unused", "{}");
        let mut raw = serde_json::to_value(&stored).unwrap();
        raw["scene"] = serde_json::Value::Null;
        raw["location"] = serde_json::Value::Null;
        std::fs::write(store.record_path(&id), raw.to_string()).unwrap();

        let manager = GameStateManager::new(store, GameConfig::default());
        let record = manager.load_game_state(&id).await.unwrap();
        assert_eq!(record.scene, manager.config().opening_scene);
        assert_eq!(record.location, "Mistwood Tavern");
        assert_eq!(manager.phase(&id).await, GamePhase::Active);
    }

    #[tokio::test]
    async fn test_submit_action() {
        let manager = manager();
        let mut hero = sample_character("Thalia");
        let narrator = narrator(&["Clear.", "- Rope (1)", "A quiet hall.", "The chest opens."]);
        manager.create_new_game(&hero, &narrator).await;

        let outcome = manager
            .submit_action(&mut hero, &PlayerAction::Search, &narrator)
            .await
            .unwrap();
        assert_eq!(outcome.narrative, "The chest opens.");
        assert_eq!(outcome.xp_awarded, 15);
        assert_eq!(outcome.levels_gained, 0);
        assert_eq!(hero.experience, 15);

        let prompts = narrator.completion().prompts();
        assert!(prompts[3].contains("Current scene: A quiet hall."));

        let record = manager.load_game_state(&hero.id).await.unwrap();
        assert_eq!(record.scene, "The chest opens.");
        assert_eq!(record.game_data.recent_events, ["Thalia attempts to search the area"]);
        assert_eq!(record.game_data.character_data.character, Some(hero));
    }

    #[tokio::test]
    async fn test_failed_save_leaves_character_unchanged() {
        let manager = GameStateManager::new(FlakyStore::default(), GameConfig::default());
        let mut hero = sample_character("Thalia");
        let narrator = narrator(&["Clear.", "- Rope (1)", "A quiet hall.", "The chest opens."]);
        manager.create_new_game(&hero, &narrator).await;

        manager.store().fail_writes.store(true, Ordering::SeqCst);
        let before = hero.clone();
        assert!(matches!(
            manager.submit_action(&mut hero, &PlayerAction::Search, &narrator).await,
            Err(GameStateError::Persist(PersistError::Io(_)))
        ));
        assert_eq!(hero, before);
        assert_eq!(hero.experience, 0);

        let record = manager.load_game_state(&hero.id).await.unwrap();
        assert_eq!(record.scene, "A quiet hall.");
        assert!(record.game_data.recent_events.is_empty());
        assert_eq!(record.game_data.character_data.character, Some(before));
    }

    #[tokio::test]
    async fn test_submit_action_requires_game() {
        let manager = manager();
        let mut hero = sample_character("Thalia");
        let narrator = narrator(&[]);

        assert!(matches!(
            manager.submit_action(&mut hero, &PlayerAction::Look, &narrator).await,
            Err(GameStateError::NoSavedGame(_))
        ));
        assert!(matches!(
            manager
                .submit_action(&mut hero, &PlayerAction::Custom("   ".into()), &narrator)
                .await,
            Err(GameStateError::EmptyAction)
        ));
        assert_eq!(hero.experience, 0);
    }

    #[tokio::test]
    async fn test_combat_lifecycle() {
        let manager = manager();
        let id = CharacterId::new();

        assert!(matches!(
            manager.start_combat(&id).await,
            Err(GameStateError::NoSavedGame(_))
        ));

        manager
            .save_game_state(&id, "A dark cave.", "Cave", &GameData::default())
            .await
            .unwrap();
        assert!(matches!(
            manager.add_combatant(&id, "Goblin", 12).await,
            Err(GameStateError::CombatNotActive)
        ));

        manager.start_combat(&id).await.unwrap();
        manager.add_combatant(&id, "Goblin", 12).await.unwrap();
        let combat = manager.add_combatant(&id, "Hero", 17).await.unwrap();
        assert_eq!(combat.combatants[0].name, "Hero");
        assert!(matches!(
            manager.add_combatant(&id, "Hero", 5).await,
            Err(GameStateError::Combat(_))
        ));

        let ended = manager.end_combat(&id).await.unwrap();
        assert!(!ended.active);
        assert!(matches!(
            manager.end_combat(&id).await,
            Err(GameStateError::CombatNotActive)
        ));

        let record = manager.load_game_state(&id).await.unwrap();
        assert_eq!(record.scene, "A dark cave.");
        assert!(!record.game_data.combat_active());
    }
}
