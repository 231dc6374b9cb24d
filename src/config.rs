use crate::storage::{BackendLocal, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yaml";

/// Default provider preset used for new configs
const DEFAULT_PROVIDER: &str = "openai";
/// Default request timeout for remote embedding calls
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Similarity at or below which a candidate is discarded as noise
const DEFAULT_NOISE_FLOOR: f32 = 0.3;
/// Minimum similarity for a single remaining candidate to be shown
const DEFAULT_LONE_MATCH: f32 = 0.6;
/// Gap between first and second candidate that makes the first a standout
const DEFAULT_STANDOUT_GAP: f32 = 0.15;
/// Minimum average of the top candidates for them to be shown as a group
const DEFAULT_CLUSTER_AVERAGE: f32 = 0.65;
/// Maximum number of related notes ever shown
const DEFAULT_MAX_RESULTS: usize = 3;

/// Provider names accepted in `embedding.provider`
pub const PROVIDERS: [&str; 6] = ["openai", "gemini", "deepseek", "siliconflow", "custom", "local"];

/// Settings for generating note embeddings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider preset: openai, gemini, deepseek, siliconflow, custom or local
    #[serde(default = "default_provider")]
    pub provider: String,

    /// OpenAI-compatible API root, e.g. "https://api.openai.com/v1".
    /// Empty means the preset's URL.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Model name. Empty means the preset's model.
    #[serde(default)]
    pub model: String,

    /// Timeout for a single embedding request in seconds
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    DEFAULT_EMBEDDING_TIMEOUT_SECS
}

/// Tunables of the related-notes decision.
///
/// The defaults were calibrated against `text-embedding-3-small` style score
/// distributions. Other models may need different values, which is why they
/// live in the config file rather than in code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelatednessConfig {
    /// Candidates with similarity <= this are dropped before any ranking
    #[serde(default = "default_noise_floor")]
    pub noise_floor: f32,

    /// A single candidate is shown when its similarity is above this
    #[serde(default = "default_lone_match")]
    pub lone_match: f32,

    /// The top candidate alone is shown when it beats the runner-up by more than this
    #[serde(default = "default_standout_gap")]
    pub standout_gap: f32,

    /// The top candidates are shown together when their average is above this
    #[serde(default = "default_cluster_average")]
    pub cluster_average: f32,

    /// Upper bound on the number of related notes
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for RelatednessConfig {
    fn default() -> Self {
        Self {
            noise_floor: DEFAULT_NOISE_FLOOR,
            lone_match: DEFAULT_LONE_MATCH,
            standout_gap: DEFAULT_STANDOUT_GAP,
            cluster_average: DEFAULT_CLUSTER_AVERAGE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

fn default_noise_floor() -> f32 {
    DEFAULT_NOISE_FLOOR
}

fn default_lone_match() -> f32 {
    DEFAULT_LONE_MATCH
}

fn default_standout_gap() -> f32 {
    DEFAULT_STANDOUT_GAP
}

fn default_cluster_average() -> f32 {
    DEFAULT_CLUSTER_AVERAGE
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub relatedness: RelatednessConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

/// Data directory: `SPARK_BASE_PATH` or `~/.local/share/spark`.
pub fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("SPARK_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = homedir::my_home()
        .context("couldnt find home dir")?
        .context("couldnt find home dir")?;

    Ok(home.join(".local/share/spark"))
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let rel = &self.relatedness;
        for (name, value) in [
            ("noise_floor", rel.noise_floor),
            ("lone_match", rel.lone_match),
            ("standout_gap", rel.standout_gap),
            ("cluster_average", rel.cluster_average),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("relatedness.{name} must be between 0.0 and 1.0, got {value}");
            }
        }

        if rel.max_results == 0 {
            bail!("relatedness.max_results must be greater than 0");
        }

        let emb = &self.embedding;
        if !PROVIDERS.contains(&emb.provider.as_str()) {
            bail!(
                "embedding.provider must be one of {}, got '{}'",
                PROVIDERS.join(", "),
                emb.provider
            );
        }

        if emb.provider == "custom" && emb.base_url.trim().is_empty() {
            bail!("embedding.base_url is required for the custom provider");
        }

        if emb.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(&base_path()?)
    }

    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        let store = BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        if let Ok(key) = std::env::var("SPARK_API_KEY") {
            if !key.is_empty() {
                config.embedding.api_key = key;
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}
