use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub docs_dir: PathBuf,
    pub history_dir: PathBuf,
}

/// Access gate settings. The secret may instead come from the
/// `CCHAT_ACCESS_SECRET` environment variable; config wins when both are set.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_temperature() -> f64 {
    0.3
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7410".to_string()
}

/// What to do when a stored document fails to parse during a corpus load.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ParseErrorPolicy {
    /// Log a warning for the failed file and continue with the rest.
    #[default]
    Skip,
    /// Fail the whole load on the first unparseable file.
    Abort,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub on_parse_error: ParseErrorPolicy,
}

/// When the vector index is rebuilt relative to document-set changes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RebuildTrigger {
    /// Fingerprint the document set before every question; rebuild only
    /// when it changed. New uploads become searchable on the next question.
    #[default]
    OnChange,
    /// Build once when the session first needs it. Uploads made after that
    /// are not searchable until the next session.
    SessionStart,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexConfig {
    #[serde(default)]
    pub rebuild: RebuildTrigger,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!("Unknown llm provider: '{}'. Must be openai or ollama.", other),
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("cchat.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[storage]
docs_dir = "docs"
history_dir = "history"

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768

[llm]
provider = "ollama"
model = "llama3"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(tmp.path(), MINIMAL);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.chunk_overlap, 200);
        assert_eq!(cfg.retrieval.top_k, 4);
        assert!((cfg.llm.temperature - 0.3).abs() < 1e-9);
        assert_eq!(cfg.ingest.on_parse_error, ParseErrorPolicy::Skip);
        assert_eq!(cfg.index.rebuild, RebuildTrigger::OnChange);
        assert!(cfg.auth.secret.is_none());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let body = format!(
            "{}\n[chunking]\nchunk_size = 100\nchunk_overlap = 100\n",
            MINIMAL
        );
        let path = write_config(tmp.path(), &body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_llm_provider_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let body = MINIMAL.replace(
            "provider = \"ollama\"\nmodel = \"llama3\"",
            "provider = \"mystery\"\nmodel = \"llama3\"",
        );
        let path = write_config(tmp.path(), &body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn policy_values_parse() {
        let tmp = tempfile::TempDir::new().unwrap();
        let body = format!(
            "{}\n[ingest]\non_parse_error = \"abort\"\n\n[index]\nrebuild = \"session-start\"\n",
            MINIMAL
        );
        let path = write_config(tmp.path(), &body);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.ingest.on_parse_error, ParseErrorPolicy::Abort);
        assert_eq!(cfg.index.rebuild, RebuildTrigger::SessionStart);
    }
}
