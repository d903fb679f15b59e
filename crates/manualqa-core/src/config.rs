//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K=5`). Settings are
//! read once at startup and never mutated afterwards.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const CONTEXT_PLACEHOLDER: &str = "{context}";
pub const QUERY_PLACEHOLDER: &str = "{query}";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are a flight operations assistant. \
Answer the question using only the manual excerpt below. If the excerpt does not \
contain the answer, say that the manual excerpt does not cover it.\n\n\
Manual excerpt:\n{context}\n\nQuestion: {query}\n\nAnswer:";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::raw().only(&["GEMINI_API_KEY"]).map(|_| "models.gemini_api_key".into()))
            .merge(Env::prefixed("APP_").split("__"));

        tracing::debug!(env = %env_name, "configuration sources merged");
        Ok(Self { figment })
    }

    /// Typed, validated settings. Missing keys take their defaults.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub answer: AnswerSettings,
    pub models: ModelSettings,
    pub data: DataSettings,
    pub document: DocumentSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));
        if self.chunking.chunk_size == 0 {
            return invalid("chunking.chunk_size must be positive");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return invalid("chunking.chunk_overlap must be smaller than chunking.chunk_size");
        }
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be positive");
        }
        if self.retrieval.overfetch_factor == 0 {
            return invalid("retrieval.overfetch_factor must be at least 1");
        }
        if self.answer.context_passages == 0 {
            return invalid("answer.context_passages must be at least 1");
        }
        let template = &self.answer.prompt_template;
        if !template.contains(CONTEXT_PLACEHOLDER) || !template.contains(QUERY_PLACEHOLDER) {
            return invalid("answer.prompt_template must contain {context} and {query}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 800, chunk_overlap: 150 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of passages returned after reranking.
    pub top_k: usize,
    /// First-stage pool is `top_k * overfetch_factor`; 1 means rerank can only reorder.
    pub overfetch_factor: usize,
}

impl RetrievalSettings {
    pub fn pool_size(&self) -> usize {
        self.top_k.saturating_mul(self.overfetch_factor).max(self.top_k)
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3, overfetch_factor: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnswerSettings {
    pub prompt_template: String,
    /// Reranked passages concatenated into `{context}`.
    pub context_passages: usize,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self { prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(), context_passages: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_model: String,
    pub embedding_dir: Option<String>,
    pub reranker_model: String,
    pub reranker_dir: Option<String>,
    pub llm_name: String,
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_dir: None,
            reranker_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            reranker_dir: None,
            llm_name: "gemini-2.5-flash".to_string(),
            gemini_api_key: None,
            gemini_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DataSettings {
    pub documents_dir: String,
    pub lancedb_dir: String,
    pub table: String,
}

impl DataSettings {
    pub fn documents_path(&self) -> PathBuf {
        expand_path(&self.documents_dir)
    }

    pub fn lancedb_path(&self) -> PathBuf {
        expand_path(&self.lancedb_dir)
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            documents_dir: "data/documents".to_string(),
            lancedb_dir: "data/indexes/lancedb".to_string(),
            table: "passages".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentSettings {
    pub aircraft_type: Option<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self { aircraft_type: Some("Boeing 737".to_string()) }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().expect("defaults validate");
        assert_eq!(settings.chunking.chunk_size, 800);
        assert_eq!(settings.retrieval.pool_size(), 9);
    }

    #[test]
    fn toml_and_env_layers_merge() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [chunking]
                chunk_size = 400
                chunk_overlap = 50

                [retrieval]
                top_k = 2
                "#,
            )?;
            jail.set_env("RUST_ENV", "test");
            jail.set_env("APP_RETRIEVAL__OVERFETCH_FACTOR", "4");
            jail.set_env("GEMINI_API_KEY", "secret");

            let config = Config::load().map_err(|e| e.to_string())?;
            let settings = config.settings().map_err(|e| e.to_string())?;
            assert_eq!(settings.chunking.chunk_size, 400);
            assert_eq!(settings.retrieval.pool_size(), 8);
            assert_eq!(settings.models.gemini_api_key.as_deref(), Some("secret"));
            assert_eq!(settings.data.table, "passages");
            Ok(())
        });
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        let mut settings = Settings::default();
        settings.chunking.chunk_overlap = settings.chunking.chunk_size;
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_template_without_placeholders() {
        let mut settings = Settings::default();
        settings.answer.prompt_template = "Answer: {query}".to_string();
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
    }
}
