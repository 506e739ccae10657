use crate::embedder::Embedder;
use crate::vector_store::VectorIndex;
use async_trait::async_trait;
use lawguide_common::{LawGuideError, Passage, Result, ScoredPassage};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 4;

#[async_trait]
pub trait PassageRetriever: Send + Sync {
    /// Top `k` passages for `query` with their similarity scores, best first.
    async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>>;

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let scored = self.retrieve_scored(query, k).await?;
        Ok(scored.into_iter().map(|s| s.passage).collect())
    }
}

/// Embeds the query and scans the shared index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

#[async_trait]
impl PassageRetriever for Retriever {
    async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        if query.trim().is_empty() {
            return Err(LawGuideError::InvalidInput("query must not be empty".to_string()));
        }
        if k == 0 {
            return Err(LawGuideError::InvalidInput("k must be at least 1".to_string()));
        }
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let results = self.index.search(&vector, k)?;

        debug!(
            "Retrieved {} passages for query ({} chars), top score {:?}",
            results.len(),
            query.chars().count(),
            results.first().map(|r| r.score)
        );
        Ok(results)
    }
}
