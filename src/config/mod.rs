// src/config/mod.rs
//! Application settings loaded from TOML, with a handful of env overrides.
//!
//! Resolution order:
//!   1) $APP_CONFIG_PATH, else `config/app.toml` (missing file → defaults)
//!   2) env overrides: DATA_DIR, CORPUS_MODE, BETA_EXPIRES_AT

pub mod ai;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Local};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_APP_CONFIG_PATH: &str = "config/app.toml";
pub const ENV_APP_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const ENV_DATA_DIR: &str = "DATA_DIR";
pub const ENV_CORPUS_MODE: &str = "CORPUS_MODE";
pub const ENV_BETA_EXPIRES_AT: &str = "BETA_EXPIRES_AT";

pub const DEFAULT_SERVICE_NAME: &str = "Agente de planificación Web";
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Which body of regulation text answers legal questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorpusMode {
    /// The 11 tomos plus structured resources.
    #[default]
    Volumes,
    /// One superseding regulation document (JSON, `analisis_completo` field).
    SingleDocument,
}

impl CorpusMode {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "volumes" | "tomos" => Ok(Self::Volumes),
            "single_document" | "emergencia" => Ok(Self::SingleDocument),
            other => Err(anyhow!("unsupported corpus mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusSection {
    #[serde(default)]
    pub mode: CorpusMode,
    /// Relative paths resolve against `data_dir`.
    #[serde(default = "default_document_path")]
    pub document_path: PathBuf,
}

fn default_document_path() -> PathBuf {
    PathBuf::from("reglamento_emergencia_jp41_chatbot.json")
}

impl Default for CorpusSection {
    fn default() -> Self {
        Self {
            mode: CorpusMode::default(),
            document_path: default_document_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BetaSection {
    /// Absolute cutover (RFC 3339). Wins over `duration_minutes`.
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Cutover relative to process start.
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub beta: BetaSection,
    #[serde(default)]
    pub cache: CacheSection,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
fn default_log_path() -> PathBuf {
    PathBuf::from("log.txt")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            data_dir: default_data_dir(),
            static_dir: default_static_dir(),
            log_path: default_log_path(),
            corpus: CorpusSection::default(),
            beta: BetaSection::default(),
            cache: CacheSection::default(),
        }
    }
}

impl AppConfig {
    /// Defaults rooted at `data_dir`; handy for tests and fixtures.
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            log_path: data_dir.join("log.txt"),
            data_dir,
            ..Self::default()
        }
    }

    /// Load from `$APP_CONFIG_PATH` or `config/app.toml`, then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_APP_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_APP_CONFIG_PATH));

        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading app config from {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("parsing app config at {}", path.display()))?
        } else {
            Self::default()
        };

        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(toml_str)?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(mode) = std::env::var(ENV_CORPUS_MODE) {
            self.corpus.mode = CorpusMode::parse(&mode)?;
        }
        if let Ok(at) = std::env::var(ENV_BETA_EXPIRES_AT) {
            if !at.trim().is_empty() {
                self.beta.expires_at = Some(at);
            }
        }
        Ok(())
    }

    /// Superseding document path, resolved against `data_dir` when relative.
    pub fn document_path(&self) -> PathBuf {
        if self.corpus.document_path.is_absolute() {
            self.corpus.document_path.clone()
        } else {
            self.data_dir.join(&self.corpus.document_path)
        }
    }

    pub fn glossary_path(&self) -> PathBuf {
        self.data_dir.join("glosario.txt")
    }

    /// Beta cutover in local time; `None` keeps the gate open.
    pub fn beta_expiration(&self, started: DateTime<Local>) -> anyhow::Result<Option<DateTime<Local>>> {
        if let Some(raw) = &self.beta.expires_at {
            let at = DateTime::parse_from_rfc3339(raw.trim())
                .with_context(|| format!("invalid beta.expires_at: {raw}"))?;
            return Ok(Some(at.with_timezone(&Local)));
        }
        Ok(self
            .beta
            .duration_minutes
            .map(|m| started + Duration::minutes(m)))
    }
}
