//! Lore and rules knowledge base with similarity search.
//!
//! Documents are embedded once when the index is built. Queries are embedded
//! on demand and ranked by cosine similarity. A failed build or search gives
//! an empty result rather than an error, so narration carries on without
//! extra context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedding failed: {0}")]
    Embedding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Lore,
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub content_type: ContentType,
}

impl Document {
    pub fn lore(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            content_type: ContentType::Lore,
        }
    }

    pub fn rule(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            content_type: ContentType::Rule,
        }
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Where knowledge-base documents come from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Document>, KnowledgeError>;
}

/// A fixed set of documents.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<Document>,
}

impl InMemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn load(&self) -> Result<Vec<Document>, KnowledgeError> {
        Ok(self.documents.clone())
    }
}

/// Loads every `.txt` and `.md` file under a directory, recursively.
///
/// A file is a rule if it sits under a `rules` directory or its name ends in
/// `rule` or `rules`. Everything else is lore.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn content_type(relative: &Path) -> ContentType {
        let in_rules_dir = relative
            .parent()
            .map(|dir| {
                dir.components()
                    .any(|c| c.as_os_str().eq_ignore_ascii_case("rules"))
            })
            .unwrap_or(false);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if in_rules_dir || stem.ends_with("rule") || stem.ends_with("rules") {
            ContentType::Rule
        } else {
            ContentType::Lore
        }
    }

    fn is_document(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt") | Some("md")
        )
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn load(&self) -> Result<Vec<Document>, KnowledgeError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| KnowledgeError::Io { path, source }
        };

        let mut documents = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err(&dir))?;
            while let Some(entry) = entries.next_entry().await.map_err(io_err(&dir))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(io_err(&path))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !Self::is_document(&path) {
                    continue;
                }

                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(io_err(&path))?;
                let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                documents.push(Document {
                    id: relative.to_string_lossy().replace('\\', "/"),
                    content,
                    content_type: Self::content_type(relative),
                });
            }
        }

        // read_dir order is platform dependent
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }
}

// ============================================================================
// Embedding
// ============================================================================

/// Turns text into a fixed-length vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError>;
}

/// Feature-hashed bag of words, L2-normalised.
///
/// Needs no model and gives stable results, which is enough to match a
/// question about "the tavern" to a document that mentions it.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 1024;

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    // FNV-1a
    fn hash(word: &str) -> u64 {
        word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let index = (Self::hash(&word.to_lowercase()) % self.dimensions as u64) as usize;
            vector[index] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }
}

/// Cosine similarity, 0.0 when either vector is all zeros or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

// ============================================================================
// Index
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Documents with their embeddings.
pub struct KnowledgeIndex {
    embedder: Box<dyn Embedder>,
    entries: Vec<(Document, Vec<f32>)>,
}

impl KnowledgeIndex {
    /// An index with nothing in it. Every search misses.
    pub fn empty() -> Self {
        Self {
            embedder: Box::new(HashingEmbedder::default()),
            entries: Vec::new(),
        }
    }

    /// Embed every document. Fails if any document cannot be embedded.
    pub fn from_documents(
        documents: Vec<Document>,
        embedder: Box<dyn Embedder>,
    ) -> Result<Self, KnowledgeError> {
        let entries = documents
            .into_iter()
            .map(|doc| {
                let embedding = embedder.embed(&doc.content)?;
                Ok((doc, embedding))
            })
            .collect::<Result<Vec<_>, KnowledgeError>>()?;
        Ok(Self { embedder, entries })
    }

    /// Load and embed documents from a source, or an empty index if that fails.
    pub async fn build(source: &dyn DocumentSource, embedder: Box<dyn Embedder>) -> Self {
        let documents = match source.load().await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "Knowledge base unavailable, continuing without it");
                return Self::empty();
            }
        };

        match Self::from_documents(documents, embedder) {
            Ok(index) => {
                debug!(documents = index.len(), "Knowledge base indexed");
                index
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base indexing failed, continuing without it");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top `k` documents similar to `query`, optionally limited to one content type.
    ///
    /// Documents with no overlap at all are never returned.
    pub fn search(&self, query: &str, k: usize, filter: Option<ContentType>) -> Vec<SearchHit> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }

        let query_embedding = match self.embedder.embed(query) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Knowledge search failed");
                return Vec::new();
            }
        };

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|(doc, _)| filter.map_or(true, |f| doc.content_type == f))
            .map(|(doc, embedding)| SearchHit {
                document: doc.clone(),
                score: cosine_similarity(&query_embedding, embedding),
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }
}

impl Default for KnowledgeIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("documents", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, KnowledgeError> {
            Err(KnowledgeError::Embedding("model offline".into()))
        }
    }

    fn sample_documents() -> Vec<Document> {
        vec![
            Document::lore(
                "tavern",
                "The Mistwood Tavern is a cozy place known for its strong ale and warm fire.",
            ),
            Document::lore(
                "forest",
                "Beyond the village lies the Whispering Forest where wolves hunt at night.",
            ),
            Document::rule(
                "combat_rules",
                "An attack hits when the attack roll meets or beats the armor class of the target.",
            ),
        ]
    }

    #[test]
    fn test_embedding_is_normalised() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("The tavern serves strong ale").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let empty = embedder.embed("").unwrap();
        assert!(empty.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_ranks_relevant_first() {
        let index =
            KnowledgeIndex::from_documents(sample_documents(), Box::new(HashingEmbedder::default()))
                .unwrap();
        let hits = index.search("What ale does the tavern serve?", 5, None);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].document.id, "tavern");
    }

    #[test]
    fn test_search_filters_by_type() {
        let index =
            KnowledgeIndex::from_documents(sample_documents(), Box::new(HashingEmbedder::default()))
                .unwrap();
        let hits = index.search("attack roll against the tavern", 5, Some(ContentType::Rule));
        assert!(hits.iter().all(|h| h.document.content_type == ContentType::Rule));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_respects_k() {
        let index =
            KnowledgeIndex::from_documents(sample_documents(), Box::new(HashingEmbedder::default()))
                .unwrap();
        let hits = index.search("the tavern forest attack wolves ale", 1, None);
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_build_degrades_to_empty() {
        let missing = DirectorySource::new("/definitely/not/a/knowledge/base");
        let index = KnowledgeIndex::build(&missing, Box::new(HashingEmbedder::default())).await;
        assert!(index.is_empty());
        assert!(index.search("tavern", 5, None).is_empty());

        let source = InMemorySource::new(sample_documents());
        let index = KnowledgeIndex::build(&source, Box::new(BrokenEmbedder)).await;
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_directory_source_tags_content() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("rules")).unwrap();
        std::fs::write(
            dir.path().join("example_lore.txt"),
            "The Mistwood Tavern is cozy.",
        )
        .unwrap();
        std::fs::write(dir.path().join("magic_rules.md"), "Spells need components.").unwrap();
        std::fs::write(dir.path().join("rules").join("grapple.txt"), "Grappling uses Athletics.")
            .unwrap();
        std::fs::write(dir.path().join("map.png"), [0u8, 1, 2]).unwrap();

        let documents = DirectorySource::new(dir.path()).load().await.unwrap();
        let tags: Vec<(&str, ContentType)> = documents
            .iter()
            .map(|d| (d.id.as_str(), d.content_type))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("example_lore.txt", ContentType::Lore),
                ("magic_rules.md", ContentType::Rule),
                ("rules/grapple.txt", ContentType::Rule),
            ]
        );
    }
}
