//! Language model access.
//!
//! The pipeline only sees the [`Analyzer`] trait. [`ProviderChain`] tries the
//! configured providers in order and returns the first answer.

mod providers;

use std::time::Duration;

pub use providers::Provider;

use crate::config::ProvidersConfig;

pub const GEMINI_KEY_ENV: &str = "GOOGLE_AI_API_KEY";
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyzerError {
    #[error("no analyzer configured, set GOOGLE_AI_API_KEY or OPENROUTER_API_KEY")]
    NotConfigured,

    /// No provider could be reached
    #[error("analyzer unreachable: {0}")]
    Unreachable(String),

    /// A provider answered, but not with usable text
    #[error("analyzer rejected request: {0}")]
    Rejected(String),
}

pub trait Analyzer: Send + Sync {
    fn analyze(&self, prompt: &str) -> Result<String, AnalyzerError>;
}

pub struct ProviderChain {
    client: reqwest::blocking::Client,
    providers: Vec<Provider>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Provider>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self { client, providers })
    }

    /// Gemini first, then OpenRouter; a provider is included only when its
    /// key is set.
    pub fn from_env(config: &ProvidersConfig) -> anyhow::Result<Self> {
        let mut providers = Vec::new();

        if let Some(api_key) = env_key(GEMINI_KEY_ENV) {
            providers.push(Provider::Gemini {
                api_key,
                model: config.gemini_model.clone(),
                base_url: config.gemini_base_url.clone(),
            });
        }

        if let Some(api_key) = env_key(OPENROUTER_KEY_ENV) {
            providers.push(Provider::OpenRouter {
                api_key,
                model: config.openrouter_model.clone(),
                base_url: config.openrouter_base_url.clone(),
            });
        }

        if providers.is_empty() {
            log::warn!("no analyzer api key set, content analysis will be unavailable");
        } else {
            let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
            log::info!("analyzer providers: {}", names.join(", "));
        }

        Self::new(providers, Duration::from_secs(config.timeout_secs))
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }
}

impl Analyzer for ProviderChain {
    fn analyze(&self, prompt: &str) -> Result<String, AnalyzerError> {
        if self.providers.is_empty() {
            return Err(AnalyzerError::NotConfigured);
        }

        let mut rejected = None;
        let mut unreachable = None;

        for provider in &self.providers {
            log::debug!("calling {}", provider.name());

            match provider.generate(&self.client, prompt) {
                Ok(answer) => return Ok(answer),
                Err(err) => {
                    log::warn!("{err}, trying next provider");
                    match err {
                        AnalyzerError::Rejected(msg) => rejected = Some(msg),
                        AnalyzerError::Unreachable(msg) => unreachable = Some(msg),
                        AnalyzerError::NotConfigured => {}
                    }
                }
            }
        }

        match (rejected, unreachable) {
            (Some(msg), _) => Err(AnalyzerError::Rejected(msg)),
            (None, Some(msg)) => Err(AnalyzerError::Unreachable(msg)),
            (None, None) => Err(AnalyzerError::NotConfigured),
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
