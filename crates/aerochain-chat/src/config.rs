//! Provider credentials and selection.

use serde::Serialize;

use crate::error::{ChatError, Result};
use crate::types::LLMProvider;

pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const MISSING_KEY_MESSAGE: &str =
    "No valid API Key found (OPENAI_API_KEY or GOOGLE_API_KEY).";

/// Provider configuration, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Custom endpoint for OpenAI-compatible servers and proxies.
    pub openai_base_url: Option<String>,
    pub google_base_url: Option<String>,
    pub google_model: Option<String>,
    pub openai_model: Option<String>,
}

/// Settings for the Google backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    /// Fold the system prompt into the first user turn.
    pub convert_system_message_to_human: bool,
}

/// Settings for an OpenAI-compatible backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAISettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
}

/// Result of provider selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSettings {
    Google(GoogleSettings),
    OpenAICompatible(OpenAISettings),
}

impl ProviderSettings {
    pub fn provider(&self) -> LLMProvider {
        match self {
            Self::Google(_) => LLMProvider::Google,
            Self::OpenAICompatible(_) => LLMProvider::OpenAICompatible,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Google(s) => &s.model,
            Self::OpenAICompatible(s) => &s.model,
        }
    }
}

/// Public description of the active provider (no keys).
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub google_configured: bool,
    pub openai_configured: bool,
    pub custom_base_url: bool,
}

impl ProviderConfig {
    /// Load credentials from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            google_api_key: get("GOOGLE_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            google_base_url: get("GOOGLE_BASE_URL"),
            google_model: get("GOOGLE_MODEL"),
            openai_model: get("OPENAI_MODEL"),
        }
    }

    /// Pick exactly one backend: Google first, then OpenAI-compatible.
    pub fn resolve(&self) -> Result<ProviderSettings> {
        if let Some(key) = &self.google_api_key {
            return Ok(ProviderSettings::Google(GoogleSettings {
                api_key: key.clone(),
                model: self
                    .google_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.into()),
                base_url: trim_base_url(
                    self.google_base_url.as_deref().unwrap_or(DEFAULT_GOOGLE_BASE_URL),
                ),
                temperature: 0.0,
                convert_system_message_to_human: true,
            }));
        }

        if let Some(key) = &self.openai_api_key {
            return Ok(ProviderSettings::OpenAICompatible(OpenAISettings {
                api_key: key.clone(),
                model: self
                    .openai_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
                base_url: trim_base_url(
                    self.openai_base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL),
                ),
                temperature: 0.0,
            }));
        }

        Err(ChatError::Config(MISSING_KEY_MESSAGE.into()))
    }

    pub fn summary(&self) -> ProviderSummary {
        let resolved = self.resolve().ok();
        ProviderSummary {
            provider: resolved.as_ref().map(|s| s.provider().to_string()),
            model: resolved.as_ref().map(|s| s.model().to_string()),
            google_configured: self.google_api_key.is_some(),
            openai_configured: self.openai_api_key.is_some(),
            custom_base_url: self.openai_base_url.is_some(),
        }
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(google: Option<&str>, openai: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            google_api_key: google.map(String::from),
            openai_api_key: openai.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_google_takes_precedence() {
        let settings = config(Some("g-key"), Some("o-key")).resolve().unwrap();
        match settings {
            ProviderSettings::Google(g) => {
                assert_eq!(g.api_key, "g-key");
                assert_eq!(g.model, DEFAULT_GOOGLE_MODEL);
                assert_eq!(g.temperature, 0.0);
                assert!(g.convert_system_message_to_human);
            }
            other => panic!("expected google, got {:?}", other),
        }
    }

    #[test]
    fn test_openai_fallback_with_base_url() {
        let mut cfg = config(None, Some("o-key"));
        cfg.openai_base_url = Some("http://localhost:11434/v1/".into());
        match cfg.resolve().unwrap() {
            ProviderSettings::OpenAICompatible(o) => {
                assert_eq!(o.model, DEFAULT_OPENAI_MODEL);
                assert_eq!(o.base_url, "http://localhost:11434/v1");
                assert_eq!(o.temperature, 0.0);
            }
            other => panic!("expected openai, got {:?}", other),
        }
    }

    #[test]
    fn test_no_credentials() {
        let err = config(None, None).resolve().unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
        assert_eq!(err.to_string(), MISSING_KEY_MESSAGE);
    }

    #[test]
    fn test_empty_env_values_are_unset() {
        let cfg = ProviderConfig::from_lookup(|key| match key {
            "GOOGLE_API_KEY" => Some("".into()),
            "OPENAI_API_KEY" => Some("sk-test".into()),
            _ => None,
        });
        assert!(cfg.google_api_key.is_none());
        assert_eq!(cfg.resolve().unwrap().provider(), LLMProvider::OpenAICompatible);
    }

    #[test]
    fn test_summary_hides_keys() {
        let summary = config(Some("secret"), None).summary();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("secret"));
        assert_eq!(summary.provider.as_deref(), Some("google"));
        assert_eq!(summary.model.as_deref(), Some(DEFAULT_GOOGLE_MODEL));
    }
}
