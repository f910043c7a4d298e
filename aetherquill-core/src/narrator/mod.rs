//! The AI Game Master.
//!
//! A [`TextCompletion`] is the raw text-generation service. A [`Narrator`]
//! wraps one with a persona, conversation history and knowledge-base
//! context, and never fails: every call produces an [`AiResponse`] that
//! records whether generation succeeded. Classifying the text is a separate
//! step, see [`parse_response`].

mod agent;
mod context;
mod knowledge;
mod parser;
pub mod prompts;

pub use agent::{Narrator, NarratorConfig};
pub use context::{ContextManager, Interaction, InteractionHistory};
pub use knowledge::{
    cosine_similarity, ContentType, DirectorySource, Document, DocumentSource, Embedder,
    HashingEmbedder, InMemorySource, KnowledgeError, KnowledgeIndex, SearchHit,
};
pub use parser::{parse_response, ParseError, ParsedResponse, ResponseType};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure from the text-generation service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Error generating response: {0}")]
    Service(String),
}

/// A text-generation service: prompt in, text out.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: Option<f32>)
        -> Result<String, CompletionError>;
}

/// Outcome of a narrative generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    pub success: bool,
    pub error: Option<String>,
}

impl AiResponse {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }

    /// The generated text if generation succeeded and produced something.
    pub fn text(&self) -> Option<&str> {
        (self.success && !self.content.trim().is_empty()).then_some(self.content.as_str())
    }
}

/// Anything that can narrate: turn a prompt and optional context into a response.
///
/// Implementations report failures inside the [`AiResponse`] instead of
/// returning an error.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> AiResponse;
}
