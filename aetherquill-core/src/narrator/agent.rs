//! The Game Master agent.

use super::context::{ContextManager, DEFAULT_HISTORY_CAPACITY, DEFAULT_SEARCH_RESULTS};
use super::knowledge::{DocumentSource, HashingEmbedder, KnowledgeIndex};
use super::parser::parse_response;
use super::prompts::DEFAULT_SYSTEM_CONTEXT;
use super::{AiResponse, NarrativeService, TextCompletion};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Configuration for the [`Narrator`].
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// Sampling temperature passed to the completion service.
    pub temperature: Option<f32>,

    /// Persona used when a request brings no context of its own.
    pub system_context: String,

    pub history_capacity: usize,

    /// Knowledge-base documents pulled into each prompt.
    pub search_results: usize,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            system_context: DEFAULT_SYSTEM_CONTEXT.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            search_results: DEFAULT_SEARCH_RESULTS,
        }
    }
}

/// Wraps a [`TextCompletion`] with a persona, history and knowledge context.
pub struct Narrator<C> {
    completion: C,
    context: ContextManager,
    config: NarratorConfig,
}

impl<C: TextCompletion> Narrator<C> {
    /// A narrator with no knowledge base.
    pub fn new(completion: C, config: NarratorConfig) -> Self {
        Self::with_knowledge(completion, config, KnowledgeIndex::empty())
    }

    pub fn with_knowledge(
        completion: C,
        config: NarratorConfig,
        knowledge: KnowledgeIndex,
    ) -> Self {
        let context =
            ContextManager::new(config.history_capacity, knowledge, config.search_results);
        Self {
            completion,
            context,
            config,
        }
    }

    /// Build the knowledge index from a document source, then the narrator.
    ///
    /// An unreadable source leaves the narrator without knowledge context.
    pub async fn from_source(
        completion: C,
        config: NarratorConfig,
        source: &dyn DocumentSource,
    ) -> Self {
        let knowledge = KnowledgeIndex::build(source, Box::new(HashingEmbedder::default())).await;
        Self::with_knowledge(completion, config, knowledge)
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    pub fn completion(&self) -> &C {
        &self.completion
    }

    async fn assemble_prompt(&self, prompt: &str, context: Option<&str>) -> String {
        let persona = context.unwrap_or(self.config.system_context.as_str());
        let background = self.context.build_context(prompt).await;
        if background.is_empty() {
            format!("{persona}\n\n{prompt}")
        } else {
            format!("{persona}\n\n{background}\n\n{prompt}")
        }
    }
}

#[async_trait]
impl<C: TextCompletion> NarrativeService for Narrator<C> {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> AiResponse {
        let full_prompt = self.assemble_prompt(prompt, context).await;
        debug!(prompt_len = full_prompt.len(), "Requesting completion");

        let text = match self
            .completion
            .complete(&full_prompt, self.config.temperature)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Completion failed");
                return AiResponse::failure(e.to_string());
            }
        };

        match parse_response(&text) {
            Ok(parsed) => {
                self.context.record(prompt, &parsed.content).await;
                AiResponse::success(parsed.content)
            }
            Err(e) => {
                warn!(error = %e, "Completion returned no text");
                AiResponse::failure(e.to_string())
            }
        }
    }
}
