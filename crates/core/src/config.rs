use crate::generator::GenerationConfig;
use config::{Config, Environment, File, FileFormat};
use lawguide_common::{LawGuideError, Result};
use lawguide_knowledge::{ChunkerConfig, EmbeddingConfig, EmbeddingProvider, Metric, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const CONFIG_FILE: &str = "lawguide";
const ENV_PREFIX: &str = "LAWGUIDE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
    pub metric: Metric,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vector_db/index.json"),
            metric: Metric::Cosine,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            request_timeout_secs: 120,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Complete runtime configuration: defaults, then `lawguide.{toml,yaml,json}`
/// if present, then `LAWGUIDE_*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub chunking: ChunkerConfig,
    pub retrieval: RetrievalConfig,
    pub index: IndexConfig,
    pub server: ServerConfig,
}

impl Settings {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| LawGuideError::Configuration(format!("Failed to load configuration: {}", e)))?;

        let mut settings = Self::from_config(config)?;
        settings.apply_credential_fallback(|name| std::env::var(name).ok());
        debug!("Loaded settings: {:?}", settings.redacted());
        Ok(settings)
    }

    /// Parses settings from TOML text, filling unspecified values with defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| LawGuideError::Configuration(format!("Failed to parse configuration: {}", e)))?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        config
            .try_deserialize()
            .map_err(|e| LawGuideError::Configuration(format!("Invalid configuration: {}", e)))
    }

    /// Fills missing API keys from the conventional provider variables
    /// (`OPENAI_API_KEY` for embeddings, `GROQ_API_KEY` for generation).
    pub fn apply_credential_fallback<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = |key: &Option<String>| key.as_deref().map(str::trim).unwrap_or("").is_empty();

        if self.embedding.provider == EmbeddingProvider::OpenAI && missing(&self.embedding.api_key) {
            self.embedding.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        }
        if missing(&self.generation.api_key) {
            self.generation.api_key = lookup("GROQ_API_KEY").filter(|k| !k.trim().is_empty());
        }
    }

    /// Checks what building an index needs.
    pub fn validate_for_ingest(&self) -> Result<()> {
        self.embedding.validate()?;
        self.chunking.validate()?;
        Ok(())
    }

    /// Checks what answering questions needs, credentials included.
    pub fn validate_for_query(&self) -> Result<()> {
        self.embedding.validate()?;
        self.generation.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(LawGuideError::Configuration("retrieval top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Copy with API keys masked, for logging.
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "***".to_string());
        let mut copy = self.clone();
        copy.embedding.api_key = mask(&self.embedding.api_key);
        copy.generation.api_key = mask(&self.generation.api_key);
        copy
    }
}
