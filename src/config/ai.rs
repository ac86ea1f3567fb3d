// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_legal_temperature() -> f32 {
    0.1
}
fn default_general_temperature() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "openai" (case-insensitive)
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Temperature for prompts built from regulation text.
    #[serde(default = "default_legal_temperature")]
    pub legal_temperature: f32,
    /// Temperature for the free conversational path.
    #[serde(default = "default_general_temperature")]
    pub general_temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            legal_temperature: default_legal_temperature(),
            general_temperature: default_general_temperature(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.to_lowercase();

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        // Sanitize temperatures into the range the API accepts
        if !(0.0..=2.0).contains(&cfg.legal_temperature) {
            cfg.legal_temperature = default_legal_temperature();
        }
        if !(0.0..=2.0).contains(&cfg.general_temperature) {
            cfg.general_temperature = default_general_temperature();
        }
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }

        Ok(cfg)
    }

    /// Missing or unreadable file → disabled defaults, with the key taken from env when present.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.as_ref().display(), "AI config not loaded, using defaults");
                let mut cfg = Self::default();
                if let Ok(key) = env::var("OPENAI_API_KEY") {
                    cfg.enabled = !key.trim().is_empty();
                    cfg.api_key = key;
                }
                cfg
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_sanitizes() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ai.json");
        fs::write(
            &p,
            r#"{"enabled": true, "provider": "OpenAI", "api_key": "sk-test", "legal_temperature": 9.0, "timeout_secs": 0}"#,
        )
        .unwrap();

        let cfg = AiConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.api_key, "sk-test");
        assert!((cfg.legal_temperature - 0.1).abs() < 1e-6);
        assert_eq!(cfg.timeout_secs, 60);
    }

    #[test]
    fn unknown_provider_with_env_key_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ai.json");
        fs::write(&p, r#"{"enabled": true, "provider": "acme", "api_key": "ENV"}"#).unwrap();
        assert!(AiConfig::load_from_file(&p).is_err());
    }
}
