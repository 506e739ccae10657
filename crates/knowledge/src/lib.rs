//! Document ingestion, embedding and passage retrieval.

pub mod chunker;
pub mod document_processor;
pub mod embedder;
pub mod ingestion;
pub mod semantic_search;
pub mod vector_store;

#[cfg(test)]
mod test_http;

pub use chunker::{ChunkerConfig, TextChunker};
pub use document_processor::{DocumentProcessor, LoadedCorpus, SkippedFile};
pub use embedder::{create_embedder, Embedder, EmbeddingConfig, EmbeddingProvider, HashingEmbedder, OpenAiEmbedder};
pub use ingestion::{IngestionPipeline, IngestionReport};
pub use semantic_search::{PassageRetriever, Retriever, DEFAULT_TOP_K};
pub use vector_store::{IndexHeader, Metric, VectorIndex};
