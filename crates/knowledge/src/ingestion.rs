use crate::chunker::TextChunker;
use crate::document_processor::{is_pdf, DocumentProcessor, LoadedCorpus};
use crate::embedder::Embedder;
use crate::vector_store::{Metric, VectorIndex};
use lawguide_common::{LawGuideError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub files_found: usize,
    pub files_skipped: usize,
    pub documents: usize,
    pub passages: usize,
    pub dimension: usize,
    pub embedding_model: String,
    pub output: PathBuf,
}

/// Load -> chunk -> embed -> index -> persist.
pub struct IngestionPipeline {
    processor: DocumentProcessor,
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    metric: Metric,
}

impl IngestionPipeline {
    pub fn new(chunker: TextChunker, embedder: Arc<dyn Embedder>, metric: Metric) -> Self {
        Self {
            processor: DocumentProcessor::new(),
            chunker,
            embedder,
            metric,
        }
    }

    /// Builds an index from `source` (a directory of PDFs or one PDF file)
    /// and writes it to `output`, replacing any previous index.
    pub async fn run(&self, source: &Path, output: &Path) -> Result<IngestionReport> {
        let corpus = self.load(source).await?;

        if corpus.files_found == 0 {
            return Err(LawGuideError::EmptyCorpus(format!(
                "no PDF files found in {}",
                source.display()
            )));
        }
        if corpus.documents.is_empty() {
            return Err(LawGuideError::EmptyCorpus(format!(
                "no text could be extracted from {} PDF file(s) in {}",
                corpus.files_found,
                source.display()
            )));
        }
        info!("Loaded {} documents", corpus.documents.len());

        let passages = self.chunker.chunk_documents(&corpus.documents);
        if passages.is_empty() {
            return Err(LawGuideError::EmptyCorpus("chunking produced no passages".to_string()));
        }
        info!("Produced {} passages", passages.len());

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        info!("Embedded {} passages with {}", vectors.len(), self.embedder.model_id());

        let index = VectorIndex::build(self.embedder.model_id(), self.metric, passages, vectors)?;
        let report = IngestionReport {
            files_found: corpus.files_found,
            files_skipped: corpus.skipped.len(),
            documents: corpus.documents.len(),
            passages: index.len(),
            dimension: index.dimension(),
            embedding_model: index.embedding_model().to_string(),
            output: output.to_path_buf(),
        };

        let path = output.to_path_buf();
        tokio::task::spawn_blocking(move || index.save(&path))
            .await
            .map_err(|e| LawGuideError::Internal(format!("index writer task failed: {}", e)))??;

        Ok(report)
    }

    async fn load(&self, source: &Path) -> Result<LoadedCorpus> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| LawGuideError::Io(format!("cannot access {}: {}", source.display(), e)))?;

        if metadata.is_dir() {
            return self.processor.load_directory(source).await;
        }
        if !is_pdf(source) {
            return Ok(LoadedCorpus::default());
        }

        let documents = self.processor.load_file(source).await?;
        Ok(LoadedCorpus {
            documents,
            files_found: 1,
            skipped: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkerConfig;
    use crate::embedder::HashingEmbedder;
    use lawguide_common::SourceRef;

    fn pipeline() -> IngestionPipeline {
        let chunker = TextChunker::new(ChunkerConfig::default()).unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(32).unwrap());
        IngestionPipeline::new(chunker, embedder, Metric::Cosine)
    }

    /// One-page PDF showing `text` in Helvetica, with a valid xref table.
    fn single_page_pdf(text: &str) -> Vec<u8> {
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
        }

        let xref_start = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_start
            )
            .as_bytes(),
        );
        pdf
    }

    #[tokio::test]
    async fn test_run_indexes_readable_pdfs_and_skips_corrupt_ones() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(
            source.path().join("constitution.pdf"),
            single_page_pdf("Article 21 Protection of life and personal liberty"),
        )
        .unwrap();
        std::fs::write(source.path().join("broken.pdf"), b"%PDF-1.4 truncated").unwrap();
        std::fs::write(source.path().join("notes.txt"), "not a pdf").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("vector_db").join("index.json");
        let report = pipeline().run(source.path(), &output).await.unwrap();

        assert_eq!(report.files_found, 2);
        assert_eq!(report.files_skipped, 1);
        assert!(report.documents >= 1);
        assert!(report.passages >= 1);
        assert_eq!(report.dimension, 32);
        assert_eq!(report.embedding_model, "hashing-32");

        let index = VectorIndex::load(&output).unwrap();
        assert_eq!(index.embedding_model(), "hashing-32");
        assert_eq!(index.len(), report.passages);
        assert!(index
            .entries()
            .iter()
            .all(|entry| entry.passage.source == SourceRef::new("constitution.pdf", 1)));
    }

    #[tokio::test]
    async fn test_run_accepts_single_pdf_path() {
        let source = tempfile::tempdir().unwrap();
        let pdf = source.path().join("amendments.pdf");
        std::fs::write(&pdf, single_page_pdf("Article 368 Power of Parliament to amend the Constitution")).unwrap();

        let output = source.path().join("index.json");
        let report = pipeline().run(&pdf, &output).await.unwrap();

        assert_eq!(report.files_found, 1);
        assert_eq!(report.files_skipped, 0);
        let index = VectorIndex::load(&output).unwrap();
        assert_eq!(index.entries()[0].passage.source, SourceRef::new("amendments.pdf", 1));
    }

    #[tokio::test]
    async fn test_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.json");
        let result = pipeline().run(dir.path(), &output).await;
        assert!(matches!(result, Err(LawGuideError::EmptyCorpus(_))));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_only_corrupt_files_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4 truncated").unwrap();
        let result = pipeline().run(dir.path(), &dir.path().join("index.json")).await;
        match result {
            Err(LawGuideError::EmptyCorpus(msg)) => assert!(msg.contains("1 PDF file")),
            other => panic!("expected EmptyCorpus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = pipeline()
            .run(&dir.path().join("absent"), &dir.path().join("index.json"))
            .await;
        assert!(matches!(result, Err(LawGuideError::Io(_))));
    }
}
