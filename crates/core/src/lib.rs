pub mod config;
pub mod formatting;
pub mod generator;
pub mod pipeline;
pub mod prompt;

pub use config::{IndexConfig, RetrievalConfig, ServerConfig, Settings};
pub use formatting::{format_answer, format_context, FormattedAnswer, CONTEXT_PREVIEW_CHARS};
pub use generator::{AnswerGenerator, ChatCompletionGenerator, GenerationConfig, GenerationRequest};
pub use pipeline::GroundingPipeline;

use lawguide_common::{LawGuideError, Result};
use lawguide_knowledge::{create_embedder, Embedder, Retriever, VectorIndex};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Everything the query path needs, built once at startup and shared.
pub struct AppContext {
    settings: Settings,
    index: Arc<VectorIndex>,
    pipeline: GroundingPipeline,
}

impl AppContext {
    /// Loads the index, connects the backends and checks they agree.
    /// Any failure here is fatal for the caller.
    pub async fn initialize(settings: Settings) -> Result<Self> {
        settings.validate_for_query()?;

        info!("Loading vector index from {}", settings.index.path.display());
        let index = load_index(settings.index.path.clone()).await?;

        let embedder = create_embedder(&settings.embedding)?;
        index.verify_embedding_model(embedder.model_id())?;

        info!("Checking embedding backend {}", embedder.model_id());
        let dimension = embedder.health_check().await?;
        if !index.is_empty() && dimension != index.dimension() {
            return Err(LawGuideError::ModelUnavailable(format!(
                "embedding backend returns {}-dimensional vectors but the index holds {}-dimensional vectors",
                dimension,
                index.dimension()
            )));
        }

        let generator: Arc<dyn AnswerGenerator> = Arc::new(ChatCompletionGenerator::new(settings.generation.clone())?);

        let context = Self::with_components(settings, index, embedder, generator);
        info!(
            "LawGuide ready: {} passages indexed, top_k {}",
            context.index.len(),
            context.pipeline.top_k()
        );
        Ok(context)
    }

    /// Assembles a context from already constructed parts.
    pub fn with_components(
        settings: Settings,
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        let index = Arc::new(index);
        let retriever = Arc::new(Retriever::new(index.clone(), embedder));
        let pipeline = GroundingPipeline::new(retriever, generator, settings.retrieval.top_k);
        Self {
            settings,
            index,
            pipeline,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn pipeline(&self) -> &GroundingPipeline {
        &self.pipeline
    }
}

async fn load_index(path: PathBuf) -> Result<VectorIndex> {
    tokio::task::spawn_blocking(move || VectorIndex::load(&path))
        .await
        .map_err(|e| LawGuideError::Internal(format!("index loader task failed: {}", e)))?
}
