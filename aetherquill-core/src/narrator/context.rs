//! Conversation history and knowledge context for prompts.

use super::knowledge::{ContentType, KnowledgeIndex, SearchHit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Interactions kept by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
/// Knowledge-base documents pulled into a prompt by default.
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

/// One prompt and the response it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub prompt: String,
    pub response: String,
    pub at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            at: Utc::now(),
        }
    }
}

/// Fixed-capacity history, most recent first. The oldest entry is dropped on overflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionHistory {
    capacity: usize,
    entries: VecDeque<Interaction>,
}

impl InteractionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, interaction: Interaction) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(interaction);
        self.entries.truncate(self.capacity);
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for InteractionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Supplies the history and knowledge-base context that goes into a prompt.
#[derive(Debug)]
pub struct ContextManager {
    history: Mutex<InteractionHistory>,
    knowledge: KnowledgeIndex,
    search_results: usize,
}

impl ContextManager {
    pub fn new(history_capacity: usize, knowledge: KnowledgeIndex, search_results: usize) -> Self {
        Self {
            history: Mutex::new(InteractionHistory::new(history_capacity)),
            knowledge,
            search_results,
        }
    }

    pub async fn record(&self, prompt: &str, response: &str) {
        self.history.lock().await.push(Interaction::new(prompt, response));
    }

    /// Snapshot of the history, most recent first.
    pub async fn recent(&self) -> Vec<Interaction> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    pub fn knowledge(&self) -> &KnowledgeIndex {
        &self.knowledge
    }

    pub fn relevant_documents(&self, query: &str) -> Vec<SearchHit> {
        self.knowledge.search(query, self.search_results, None)
    }

    /// Context block for a query: matching lore, matching rules and recent
    /// interactions. Empty sections are left out, so an empty knowledge base
    /// and history give an empty string.
    pub async fn build_context(&self, query: &str) -> String {
        let hits = self.relevant_documents(query);
        let mut sections = Vec::new();

        for (content_type, title) in [
            (ContentType::Lore, "Relevant Lore"),
            (ContentType::Rule, "Relevant Rules"),
        ] {
            let lines: Vec<String> = hits
                .iter()
                .filter(|h| h.document.content_type == content_type)
                .map(|h| format!("- {}", h.document.content.trim()))
                .collect();
            if !lines.is_empty() {
                sections.push(format!("## {title}\n{}", lines.join("\n")));
            }
        }

        let history = self.history.lock().await;
        if !history.is_empty() {
            let lines: Vec<String> = history
                .iter()
                .map(|i| {
                    format!(
                        "- Player: {}\n  Game Master: {}",
                        i.prompt.trim(),
                        i.response.trim()
                    )
                })
                .collect();
            sections.push(format!("## Recent Interactions\n{}", lines.join("\n")));
        }

        sections.join("\n\n")
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(
            DEFAULT_HISTORY_CAPACITY,
            KnowledgeIndex::empty(),
            DEFAULT_SEARCH_RESULTS,
        )
    }
}
