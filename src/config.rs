use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
const DEFAULT_INDEX_FILE: &str = "fingerprints.bin";
/// Characters of normalized text sent to the analyzer
const DEFAULT_ANALYSIS_CHAR_LIMIT: usize = 3000;
/// Below this the content is rejected as unanalyzable
const DEFAULT_MIN_CONTENT_CHARS: usize = 10;
const DEFAULT_NUM_RESULTS: usize = 6;
const DEFAULT_SIMILAR_K: usize = 5;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.0-flash-exp:free";
const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SCRAPE_MAX_RETRIES: u32 = 3;

/// Spam, cheat and non-English sites dropped from article results
const DEFAULT_EXCLUDED_DOMAINS: [&str; 9] = [
    "artificialaiming",
    "aimbot",
    "cheat",
    "hack",
    "csdn.net",
    "zhihu.com",
    "baidu.com",
    "justwatch",
    "moviepilot",
];

/// Fingerprint encoder parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Vector dimensions
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Tokens hashed per text
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_dimension() -> usize {
    crate::fingerprint::DEFAULT_DIMENSIONS
}

fn default_max_tokens() -> usize {
    crate::fingerprint::DEFAULT_MAX_TOKENS
}

/// Index snapshot settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Restore the index on startup and save it on shutdown
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Snapshot file name, relative to the base directory
    #[serde(default = "default_index_file")]
    pub file: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            persist: true,
            file: default_index_file(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_index_file() -> String {
    DEFAULT_INDEX_FILE.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_char_limit")]
    pub char_limit: usize,

    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            char_limit: default_analysis_char_limit(),
            min_content_chars: default_min_content_chars(),
        }
    }
}

fn default_analysis_char_limit() -> usize {
    DEFAULT_ANALYSIS_CHAR_LIMIT
}

fn default_min_content_chars() -> usize {
    DEFAULT_MIN_CONTENT_CHARS
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Recommendations returned per request
    #[serde(default = "default_num_results")]
    pub num_results: usize,

    /// Article results whose url contains any of these are dropped
    #[serde(default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_results: default_num_results(),
            excluded_domains: default_excluded_domains(),
        }
    }
}

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

fn default_excluded_domains() -> Vec<String> {
    DEFAULT_EXCLUDED_DOMAINS.iter().map(|d| d.to_string()).collect()
}

/// Language model providers. API keys are read from the environment only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    #[serde(default = "default_openrouter_model")]
    pub openrouter_model: String,

    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
            openrouter_model: default_openrouter_model(),
            openrouter_base_url: default_openrouter_base_url(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_openrouter_model() -> String {
    DEFAULT_OPENROUTER_MODEL.to_string()
}

fn default_openrouter_base_url() -> String {
    DEFAULT_OPENROUTER_BASE_URL.to_string()
}

fn default_provider_timeout_secs() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_scrape_max_retries")]
    pub max_retries: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scrape_timeout_secs(),
            max_retries: default_scrape_max_retries(),
        }
    }
}

fn default_scrape_timeout_secs() -> u64 {
    DEFAULT_SCRAPE_TIMEOUT_SECS
}

fn default_scrape_max_retries() -> u32 {
    DEFAULT_SCRAPE_MAX_RETRIES
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_similar_k")]
    pub similar_default_k: usize,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            fingerprint: FingerprintConfig::default(),
            index: IndexConfig::default(),
            analysis: AnalysisConfig::default(),
            search: SearchConfig::default(),
            similar_default_k: default_similar_k(),
            providers: ProvidersConfig::default(),
            scrape: ScrapeConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_similar_k() -> usize {
    DEFAULT_SIMILAR_K
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.fingerprint.dimension == 0 {
            bail!("fingerprint.dimension must be greater than 0");
        }

        if self.fingerprint.max_tokens == 0 {
            bail!("fingerprint.max_tokens must be greater than 0");
        }

        if self.search.num_results == 0 {
            bail!("search.num_results must be greater than 0");
        }

        if self.analysis.char_limit < self.analysis.min_content_chars {
            bail!(
                "analysis.char_limit ({}) must not be smaller than analysis.min_content_chars ({})",
                self.analysis.char_limit,
                self.analysis.min_content_chars
            );
        }

        if self.index.file.trim().is_empty() {
            bail!("index.file must not be empty");
        }

        if self.providers.timeout_secs == 0 {
            bail!("providers.timeout_secs must be greater than 0");
        }

        if self.scrape.timeout_secs == 0 {
            bail!("scrape.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().to_str().unwrap();

        let config = Config::load_with(base).unwrap();
        assert!(tmp.path().join(CONFIG_FILE).exists());
        assert_eq!(config.fingerprint.dimension, 768);
        assert_eq!(config.fingerprint.max_tokens, 500);
        assert_eq!(config.search.num_results, 6);
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.base_path(), base);
    }

    #[test]
    fn test_partial_config_is_upgraded() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "similar_default_k: 9\n").unwrap();

        let config = Config::load_with(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(config.similar_default_k, 9);
        assert_eq!(config.analysis.char_limit, DEFAULT_ANALYSIS_CHAR_LIMIT);

        // missing fields were written back
        let saved = std::fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap();
        assert!(saved.contains("excluded_domains"));
    }

    #[test]
    fn test_invalid_dimension_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "fingerprint:\n  dimension: 0\n",
        )
        .unwrap();

        let result = Config::load_with(tmp.path().to_str().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_config_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "listen: [unclosed\n").unwrap();

        let result = Config::load_with(tmp.path().to_str().unwrap());
        assert!(result.is_err());
    }
}
