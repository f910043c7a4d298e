//! Testing utilities.
//!
//! - [`MockCompletion`] replays scripted completions and records every prompt
//! - [`FailingCompletion`] always fails with a fixed error
//! - [`sample_character`] builds a valid level 1 character

use crate::character::{AbilityScores, Background, Character, CharacterClass, Race, Skill};
use crate::character_builder::{finalize_character, CharacterBuilder};
use crate::combat::InitiativeTracker;
use crate::narrator::{CompletionError, TextCompletion};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Returned once the script runs out.
pub const MOCK_DEFAULT_RESPONSE: &str = "Nothing of note happens.";

/// A completion service that returns scripted responses in order.
///
/// Use this for deterministic tests without a model behind them.
#[derive(Debug, Default)]
pub struct MockCompletion {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(String, Option<f32>)>>,
}

impl MockCompletion {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue another response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response.into());
    }

    /// Every prompt received, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn temperatures(&self) -> Vec<Option<f32>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl TextCompletion for MockCompletion {
    async fn complete(
        &self,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt.to_string(), temperature));
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or_else(|| MOCK_DEFAULT_RESPONSE.to_string()))
    }
}

/// A completion service that always fails.
#[derive(Debug, Clone)]
pub struct FailingCompletion {
    error: CompletionError,
}

impl FailingCompletion {
    pub fn new(error: CompletionError) -> Self {
        Self { error }
    }

    pub fn timeout() -> Self {
        Self::new(CompletionError::Timeout)
    }

    pub fn connection() -> Self {
        Self::new(CompletionError::Connection("connection refused".to_string()))
    }
}

#[async_trait]
impl TextCompletion for FailingCompletion {
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: Option<f32>,
    ) -> Result<String, CompletionError> {
        Err(self.error.clone())
    }
}

/// Builder preloaded with a valid human warrior named `name`.
pub fn sample_builder(name: &str) -> CharacterBuilder {
    CharacterBuilder::new()
        .name(name)
        .race(Race::Human)
        .class(CharacterClass::Warrior)
        .background(Background::Soldier)
        .scores(AbilityScores::new(15, 14, 13, 12, 13, 8))
        .skills(vec![Skill::Athletics, Skill::Endurance])
}

/// A finalized level 1 human warrior.
#[track_caller]
pub fn sample_character(name: &str) -> Character {
    match sample_builder(name).build() {
        Ok(draft) => finalize_character(draft),
        Err(e) => panic!("sample character is invalid: {e}"),
    }
}

/// Assert some combat log entry contains `text`.
#[track_caller]
pub fn assert_log_contains(tracker: &InitiativeTracker, text: &str) {
    assert!(
        tracker.combat_log().iter().any(|entry| entry.contains(text)),
        "Expected combat log to contain {text:?}, got {:#?}",
        tracker.combat_log()
    );
}
