use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact reply the generator must give when the retrieved context does not
/// support an answer. Checked verbatim by the grounding pipeline.
pub const NOT_FOUND_SENTINEL: &str = "Not found in the provided documents.";

// Source metadata carried from a PDF page to every passage cut from it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub file: String,
    /// 1-based page number inside `file`.
    pub page: u32,
}

impl SourceRef {
    pub fn new(file: impl Into<String>, page: u32) -> Self {
        Self {
            file: file.into(),
            page,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, page {}", self.file, self.page)
    }
}

/// Text of one PDF page. Produced by the loader, consumed by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source: SourceRef,
}

impl Document {
    pub fn new(text: impl Into<String>, source: SourceRef) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// A bounded slice of a document, indexed and retrieved as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: SourceRef,
    /// Position of this passage within its source document, from 0.
    pub chunk_index: usize,
}

impl Passage {
    pub fn new(text: impl Into<String>, source: SourceRef, chunk_index: usize) -> Self {
        Self {
            text: text.into(),
            source,
            chunk_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The generator produced an answer from the retrieved context.
    Grounded,
    /// The generator replied with [`NOT_FOUND_SENTINEL`].
    NotFound,
}

impl AnswerOutcome {
    /// Classifies a raw generator reply. Surrounding whitespace, markdown
    /// emphasis and quotes are ignored; the sentence itself must match.
    pub fn classify(answer: &str) -> Self {
        let stripped = answer
            .trim()
            .trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c == '`')
            .trim();
        if stripped == NOT_FOUND_SENTINEL {
            AnswerOutcome::NotFound
        } else {
            AnswerOutcome::Grounded
        }
    }
}

/// Result of one grounded question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    /// Generator output, verbatim.
    pub answer: String,
    /// Passages the answer was grounded on, best first.
    pub context: Vec<Passage>,
    pub outcome: AnswerOutcome,
}

impl Answer {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, context: Vec<Passage>) -> Self {
        let answer = answer.into();
        let outcome = AnswerOutcome::classify(&answer);
        Self {
            question: question.into(),
            answer,
            context,
            outcome,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.outcome == AnswerOutcome::NotFound
    }
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum LawGuideError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Document load error: {0}")]
    DocumentLoad(String),

    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Vector index not found: {0}")]
    IndexNotFound(String),

    #[error("Corrupt vector index: {0}")]
    CorruptIndex(String),

    #[error("Vector index build error: {0}")]
    IndexBuild(String),

    #[error("Embedding model mismatch: index was built with '{index}' but '{configured}' is configured")]
    EmbeddingModelMismatch { index: String, configured: String },

    #[error("Generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LawGuideError {
    /// Names the external dependency (or stage) that failed.
    pub fn component(&self) -> &'static str {
        match self {
            LawGuideError::InvalidInput(_) => "input",
            LawGuideError::Io(_) | LawGuideError::DocumentLoad(_) | LawGuideError::EmptyCorpus(_) => {
                "documents"
            }
            LawGuideError::ModelUnavailable(_) | LawGuideError::EmbeddingModelMismatch { .. } => {
                "embedding"
            }
            LawGuideError::IndexNotFound(_)
            | LawGuideError::CorruptIndex(_)
            | LawGuideError::IndexBuild(_) => "index",
            LawGuideError::GenerationUnavailable(_) => "generation",
            LawGuideError::Configuration(_) => "configuration",
            LawGuideError::Serialization(_) | LawGuideError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for LawGuideError {
    fn from(err: serde_json::Error) -> Self {
        LawGuideError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LawGuideError>;

// API response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
