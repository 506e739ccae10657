//! Flat vector index with versioned on-disk persistence.
//!
//! Search is an exact scan over every entry. Results are ordered by
//! descending similarity with ties kept in insertion order, which the
//! grounding prompt relies on (best passage first).

use chrono::{DateTime, Utc};
use lawguide_common::{LawGuideError, Passage, Result, ScoredPassage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

pub const FORMAT_TAG: &str = "lawguide-vector-index";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    DotProduct,
}

impl Metric {
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            Metric::DotProduct => dot,
            Metric::Cosine => {
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot / (norm_a * norm_b)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub format: String,
    pub version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub metric: Metric,
    pub entry_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub passage: Passage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredIndex {
    header: IndexHeader,
    entries: Vec<IndexEntry>,
}

/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    header: IndexHeader,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Builds an index from parallel passages and vectors.
    pub fn build(
        embedding_model: &str,
        metric: Metric,
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if passages.len() != vectors.len() {
            return Err(LawGuideError::IndexBuild(format!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if !vectors.is_empty() && dimension == 0 {
            return Err(LawGuideError::IndexBuild("embedding vectors are empty".to_string()));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimension) {
            return Err(LawGuideError::IndexBuild(format!(
                "vector {} has dimension {}, expected {}",
                i,
                v.len(),
                dimension
            )));
        }

        let entries: Vec<IndexEntry> = vectors
            .into_iter()
            .zip(passages)
            .map(|(vector, passage)| IndexEntry { vector, passage })
            .collect();

        debug!("Built vector index with {} entries (dimension {})", entries.len(), dimension);

        Ok(Self {
            header: IndexHeader {
                format: FORMAT_TAG.to_string(),
                version: FORMAT_VERSION,
                embedding_model: embedding_model.to_string(),
                dimension,
                metric,
                entry_count: entries.len(),
                created_at: Utc::now(),
            },
            entries,
        })
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn embedding_model(&self) -> &str {
        &self.header.embedding_model
    }

    pub fn dimension(&self) -> usize {
        self.header.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Writes the index to `path` atomically (temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| LawGuideError::Io(format!("cannot create {}: {}", parent.display(), e)))?;
        }

        let tmp_path = path.with_extension("tmp");
        let file = fs::File::create(&tmp_path)
            .map_err(|e| LawGuideError::Io(format!("cannot create {}: {}", tmp_path.display(), e)))?;
        let mut writer = BufWriter::new(file);

        let stored = StoredIndexRef {
            header: &self.header,
            entries: &self.entries,
        };
        serde_json::to_writer(&mut writer, &stored)?;
        writer
            .flush()
            .map_err(|e| LawGuideError::Io(format!("cannot write {}: {}", tmp_path.display(), e)))?;
        drop(writer);

        fs::rename(&tmp_path, path)
            .map_err(|e| LawGuideError::Io(format!("cannot move index into {}: {}", path.display(), e)))?;

        info!("Saved vector index with {} entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Loads and validates an index written by [`VectorIndex::save`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LawGuideError::IndexNotFound(format!(
                "no index at {} (run lawguide-ingest first)",
                path.display()
            )));
        }

        let file = fs::File::open(path)
            .map_err(|e| LawGuideError::Io(format!("cannot open {}: {}", path.display(), e)))?;
        let raw: serde_json::Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| LawGuideError::CorruptIndex(format!("{} is not a readable index: {}", path.display(), e)))?;

        check_format(&raw)?;

        let stored: StoredIndex = serde_json::from_value(raw)
            .map_err(|e| LawGuideError::CorruptIndex(format!("malformed index {}: {}", path.display(), e)))?;

        let index = Self {
            header: stored.header,
            entries: stored.entries,
        };
        index.check_consistency()?;

        info!(
            "Loaded vector index from {} ({} entries, model '{}', dimension {})",
            path.display(),
            index.len(),
            index.embedding_model(),
            index.dimension()
        );
        Ok(index)
    }

    /// Fails unless the index was built with `configured_model`.
    pub fn verify_embedding_model(&self, configured_model: &str) -> Result<()> {
        if self.header.embedding_model != configured_model {
            return Err(LawGuideError::EmbeddingModelMismatch {
                index: self.header.embedding_model.clone(),
                configured: configured_model.to_string(),
            });
        }
        Ok(())
    }

    /// Returns the `k` most similar passages, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        if k == 0 {
            return Err(LawGuideError::InvalidInput("k must be at least 1".to_string()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.header.dimension {
            return Err(LawGuideError::InvalidInput(format!(
                "query vector has dimension {}, index expects {}",
                query.len(),
                self.header.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, self.header.metric.similarity(query, &entry.vector)))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredPassage {
                passage: self.entries[i].passage.clone(),
                score,
            })
            .collect())
    }

    fn check_consistency(&self) -> Result<()> {
        if self.header.entry_count != self.entries.len() {
            return Err(LawGuideError::CorruptIndex(format!(
                "header declares {} entries, found {}",
                self.header.entry_count,
                self.entries.len()
            )));
        }
        if let Some((i, entry)) = self
            .entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.vector.len() != self.header.dimension)
        {
            return Err(LawGuideError::CorruptIndex(format!(
                "entry {} has dimension {}, header declares {}",
                i,
                entry.vector.len(),
                self.header.dimension
            )));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct StoredIndexRef<'a> {
    header: &'a IndexHeader,
    entries: &'a [IndexEntry],
}

fn check_format(raw: &serde_json::Value) -> Result<()> {
    let header = raw
        .get("header")
        .ok_or_else(|| LawGuideError::CorruptIndex("missing index header".to_string()))?;

    let format = header.get("format").and_then(|v| v.as_str()).unwrap_or("<none>");
    let version = header.get("version").and_then(|v| v.as_u64());

    if format != FORMAT_TAG || version != Some(u64::from(FORMAT_VERSION)) {
        let found_version = version.map(|v| v.to_string()).unwrap_or_else(|| "<none>".to_string());
        return Err(LawGuideError::CorruptIndex(format!(
            "expected format '{}' version {}, found '{}' version {}",
            FORMAT_TAG, FORMAT_VERSION, format, found_version
        )));
    }
    Ok(())
}
