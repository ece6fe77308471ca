//! Configuration for the OpenAI-compatible classifier client.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Default base URL of the chat-completions API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model used for classification.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Classifier client configuration.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ClassifierConfig {
    /// Base URL of the chat-completions API
    #[cfg_attr(
        feature = "config",
        arg(
            long = "classifier-base-url",
            env = "CLASSIFIER_BASE_URL",
            default_value = DEFAULT_BASE_URL
        )
    )]
    pub classifier_base_url: String,

    /// API key sent as a bearer token (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "classifier-api-key", env = "CLASSIFIER_API_KEY")
    )]
    pub classifier_api_key: Option<String>,

    /// Model name
    #[cfg_attr(
        feature = "config",
        arg(
            long = "classifier-model",
            env = "CLASSIFIER_MODEL",
            default_value = DEFAULT_MODEL
        )
    )]
    pub classifier_model: String,

    /// Request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "classifier-timeout-secs",
            env = "CLASSIFIER_TIMEOUT_SECS",
            default_value_t = DEFAULT_TIMEOUT_SECS
        )
    )]
    pub classifier_timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            classifier_base_url: DEFAULT_BASE_URL.to_owned(),
            classifier_api_key: None,
            classifier_model: DEFAULT_MODEL.to_owned(),
            classifier_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClassifierConfig {
    /// Creates a configuration pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            classifier_base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.classifier_api_key = Some(api_key.into());
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.classifier_model = model.into();
        self
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    /// Returns the user agent sent with every request.
    pub fn user_agent(&self) -> String {
        format!("kbw-moderation/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Returns the chat-completions endpoint.
    pub fn completions_url(&self) -> Result<Url> {
        let base = self.classifier_base_url.trim_end_matches('/');
        Url::parse(&format!("{base}/chat/completions"))
            .map_err(|e| Error::Config(format!("invalid base URL: {e}")))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.completions_url()?;
        if self.classifier_model.trim().is_empty() {
            return Err(Error::Config("model cannot be empty".to_owned()));
        }
        if self.classifier_timeout_secs == 0 {
            return Err(Error::Config("timeout must be positive".to_owned()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("classifier_base_url", &self.classifier_base_url)
            .field(
                "classifier_api_key",
                &self.classifier_api_key.as_ref().map(|_| "****"),
            )
            .field("classifier_model", &self.classifier_model)
            .field("classifier_timeout_secs", &self.classifier_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClassifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert!(config.user_agent().starts_with("kbw-moderation/"));
    }

    #[test]
    fn test_completions_url_handles_trailing_slash() -> anyhow::Result<()> {
        let config = ClassifierConfig::new("http://localhost:8080/v1/");
        assert_eq!(
            config.completions_url()?.as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(ClassifierConfig::new("not a url").validate().is_err());
        assert!(ClassifierConfig::default().with_model(" ").validate().is_err());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = ClassifierConfig::default().with_api_key("sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
    }
}
