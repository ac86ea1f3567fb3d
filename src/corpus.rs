// src/corpus.rs
//! Regulation text sources: the 11 numbered tomos (loaded lazily, cached for the
//! process lifetime) and the single superseding regulation document.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

pub const FIRST_VOLUME: u8 = 1;
pub const LAST_VOLUME: u8 = 11;
/// The glossary is conceptually tomo 12 but stored separately.
pub const GLOSSARY_VOLUME: u8 = 12;

/// A tomo number, always within `FIRST_VOLUME..=LAST_VOLUME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(u8);

impl VolumeId {
    pub fn new(n: u32) -> Option<Self> {
        if (FIRST_VOLUME as u32..=LAST_VOLUME as u32).contains(&n) {
            Some(Self(n as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = VolumeId> {
        (FIRST_VOLUME..=LAST_VOLUME).map(VolumeId)
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full text of one tomo plus its lowercased form for scoring.
#[derive(Debug)]
pub struct Volume {
    pub id: VolumeId,
    pub text: String,
    pub lower: String,
}

impl Volume {
    pub fn new(id: VolumeId, text: String) -> Self {
        let lower = text.to_lowercase();
        Self { id, text, lower }
    }
}

/// Lazy, read-only cache of `tomo_{N}.txt` files under a data directory.
/// Absent files are remembered as absent.
#[derive(Debug)]
pub struct VolumeStore {
    data_dir: PathBuf,
    loaded: RwLock<HashMap<VolumeId, Option<Arc<Volume>>>>,
}

impl VolumeStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, id: VolumeId) -> PathBuf {
        self.data_dir.join(format!("tomo_{}.txt", id))
    }

    pub fn get(&self, id: VolumeId) -> Option<Arc<Volume>> {
        if let Ok(guard) = self.loaded.read() {
            if let Some(hit) = guard.get(&id) {
                return hit.clone();
            }
        }

        let loaded = match fs::read_to_string(self.path_for(id)) {
            Ok(text) => {
                debug!(volume = id.get(), chars = text.len(), "tomo loaded");
                Some(Arc::new(Volume::new(id, text)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(volume = id.get(), error = %e, "tomo unreadable");
                None
            }
        };

        if let Ok(mut guard) = self.loaded.write() {
            guard.insert(id, loaded.clone());
        }
        loaded
    }

    /// Every tomo that exists on disk, in ascending order.
    pub fn available(&self) -> Vec<Arc<Volume>> {
        VolumeId::all().filter_map(|id| self.get(id)).collect()
    }
}

/// The superseding regulation: one JSON document whose `analisis_completo`
/// field holds the full analysed text.
#[derive(Debug, Clone)]
pub struct SingleDocument {
    pub text: String,
}

#[derive(Deserialize)]
struct SingleDocumentFile {
    #[serde(default)]
    analisis_completo: String,
}

impl SingleDocument {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let file: SingleDocumentFile = serde_json::from_str(raw)?;
        Ok(Self {
            text: file.analisis_completo,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading regulation document {}", path.display()))?;
        let doc = Self::from_json_str(&raw)
            .with_context(|| format!("parsing regulation document {}", path.display()))?;
        info!(chars = doc.text.chars().count(), "regulation document loaded");
        Ok(doc)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
