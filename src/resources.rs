// src/resources.rs
//! Structured per-tomo resources: flowcharts, capacity tables and resolutions.
//!
//! Files live under `{data_dir}/RespuestasParaChatBot/RespuestasIA_Tomo{N}/`,
//! either directly (`{stem}_Tomo_{N}.txt`) or inside a per-kind subfolder
//! (`Flujogramas/`, `Tablas/`, `Resoluciones/`). The flat layout is tried first;
//! the first non-empty file wins. A missing file is a plain negative result.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::context::char_prefix;
use crate::corpus::VolumeId;

pub const RESOURCE_ROOT: &str = "RespuestasParaChatBot";
/// Lines of a resolutions file shown when filtered by theme.
pub const MAX_THEME_LINES: usize = 10;
/// Characters of a resolutions file shown without a theme.
pub const RESOLUTIONS_PREVIEW_CHARS: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowchartKind {
    PublicLands,
    ZoningChanges,
    HistoricSites,
}

impl FlowchartKind {
    pub const ALL: [FlowchartKind; 3] = [
        FlowchartKind::PublicLands,
        FlowchartKind::ZoningChanges,
        FlowchartKind::HistoricSites,
    ];

    pub fn file_stem(self) -> &'static str {
        match self {
            Self::PublicLands => "flujogramaTerrPublicos",
            Self::ZoningChanges => "flujogramaCambiosCalificacion",
            Self::HistoricSites => "flujogramaSitiosHistoricos",
        }
    }

    /// Short subtype name users type ("flujograma terrenos tomo 3").
    pub fn label(self) -> &'static str {
        match self {
            Self::PublicLands => "terrenos",
            Self::ZoningChanges => "calificacion",
            Self::HistoricSites => "historicos",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::PublicLands => "Terrenos Públicos",
            Self::ZoningChanges => "Cambios de Calificación",
            Self::HistoricSites => "Sitios Históricos",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Flowchart(FlowchartKind),
    CapacityTable,
    Resolutions,
}

impl ResourceKind {
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Flowchart(k) => k.file_stem(),
            Self::CapacityTable => "TablaCabida",
            Self::Resolutions => "Resoluciones",
        }
    }

    pub fn subfolder(self) -> &'static str {
        match self {
            Self::Flowchart(_) => "Flujogramas",
            Self::CapacityTable => "Tablas",
            Self::Resolutions => "Resoluciones",
        }
    }

    /// Lines kept per tomo in an all-tomos summary.
    pub fn summary_lines(self) -> usize {
        match self {
            Self::Flowchart(_) => 4,
            Self::CapacityTable => 5,
            Self::Resolutions => 3,
        }
    }

    /// Label used when the resource is sent to the generator.
    pub fn label(self) -> &'static str {
        match self {
            Self::Flowchart(_) => "Flujograma",
            Self::CapacityTable => "Tabla",
            Self::Resolutions => "Resolución",
        }
    }
}

/// Theme filter for resolutions requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTheme {
    Environment,
    Construction,
    Zoning,
}

impl ResolutionTheme {
    pub fn detect(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        if lower.contains("ambiente") || lower.contains("ambiental") {
            Some(Self::Environment)
        } else if lower.contains("construcción") || lower.contains("construccion") {
            Some(Self::Construction)
        } else if lower.contains("zonificación") || lower.contains("zonificacion") {
            Some(Self::Zoning)
        } else {
            None
        }
    }

    pub fn needle(self) -> &'static str {
        match self {
            Self::Environment => "ambiente",
            Self::Construction => "construcción",
            Self::Zoning => "zonificación",
        }
    }
}

/// Which resource families a legal question asks about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecializedWants {
    pub flowcharts: bool,
    pub tables: bool,
    pub resolutions: bool,
}

const FLOWCHART_HINTS: &[&str] = &[
    "flujograma", "flujo", "diagrama", "pasos", "procedimiento", "proceso",
    "cambios de calificacion", "cambios de calificación", "sitios historicos",
    "sitios históricos", "terrenos publicos", "terrenos públicos",
];
const TABLE_HINTS: &[&str] = &["tabla", "cabida", "distritos", "calificacion", "calificación"];
const RESOLUTION_HINTS: &[&str] = &[
    "resolucion", "resolución", "resoluciones", "junta de planificacion",
    "junta de planificación",
];

impl SpecializedWants {
    pub fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        Self {
            flowcharts: has(FLOWCHART_HINTS),
            tables: has(TABLE_HINTS),
            resolutions: has(RESOLUTION_HINTS),
        }
    }

    pub fn any(&self) -> bool {
        self.flowcharts || self.tables || self.resolutions
    }
}

/// One resource file to be presented by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializedResource {
    pub label: &'static str,
    pub file_name: String,
    pub content: String,
}

fn read_non_empty(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => Some(content),
        _ => None,
    }
}

fn first_lines(content: &str, n: usize) -> String {
    content.split('\n').take(n).collect::<Vec<_>>().join("\n")
}

fn join_volumes(vols: &[VolumeId]) -> String {
    vols.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct ResourceLocator {
    root: PathBuf,
}

impl ResourceLocator {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            root: data_dir.as_ref().join(RESOURCE_ROOT),
        }
    }

    fn volume_dir(&self, volume: VolumeId) -> PathBuf {
        self.root.join(format!("RespuestasIA_Tomo{}", volume))
    }

    /// Flat then nested candidate paths.
    pub fn candidates(&self, kind: ResourceKind, volume: VolumeId) -> [PathBuf; 2] {
        let base = self.volume_dir(volume);
        let file = format!("{}_Tomo_{}.txt", kind.file_stem(), volume);
        [base.join(&file), base.join(kind.subfolder()).join(&file)]
    }

    /// Content of the resource, or `None` for unknown tomos and missing/empty files.
    pub fn find(&self, kind: ResourceKind, volume: u32) -> Option<String> {
        let volume = VolumeId::new(volume)?;
        let found = self
            .candidates(kind, volume)
            .iter()
            .find_map(|p| read_non_empty(p));
        debug!(kind = ?kind, volume = volume.get(), found = found.is_some(), "resource lookup");
        found
    }

    pub fn exists(&self, kind: ResourceKind, volume: VolumeId) -> bool {
        self.find(kind, volume.get() as u32).is_some()
    }

    /// Tomos that carry `kind`, ascending.
    pub fn volumes_with(&self, kind: ResourceKind) -> Vec<VolumeId> {
        VolumeId::all().filter(|v| self.exists(kind, *v)).collect()
    }

    /// "**TOMO N:** first lines..." for every tomo carrying `kind`.
    pub fn summaries(&self, kind: ResourceKind) -> Vec<String> {
        VolumeId::all()
            .filter_map(|v| {
                self.find(kind, v.get() as u32).map(|content| {
                    format!("**TOMO {}:** {}...", v, first_lines(&content, kind.summary_lines()))
                })
            })
            .collect()
    }

    pub fn flowchart_answer(&self, kind: FlowchartKind, volume: Option<u32>) -> Option<String> {
        let label = kind.label();
        let mut parts = Vec::new();
        match volume {
            Some(n) => {
                let content = self.find(ResourceKind::Flowchart(kind), n)?;
                parts.push(format!(
                    "**FLUJOGRAMA TOMO {} - {}:**\n{}",
                    n,
                    label.to_uppercase(),
                    content
                ));
            }
            None => {
                let summaries = self.summaries(ResourceKind::Flowchart(kind));
                if summaries.is_empty() {
                    return None;
                }
                parts.push(format!(
                    "🔄 **FLUJOGRAMAS DISPONIBLES - {}:**\n\n{}",
                    label.to_uppercase(),
                    summaries.join("\n\n")
                ));
                parts.push(format!(
                    "\n💡 *Para ver un flujograma completo, especifica el tomo: 'flujograma {} tomo 4'*",
                    label
                ));
            }
        }
        Some(wrap(
            &format!("🔄 **Flujograma - {}:**", crate::glossary::title_case(label)),
            &parts,
            "💡 *Información extraída de los archivos de flujogramas por tomo*",
        ))
    }

    pub fn table_answer(&self, volume: Option<u32>) -> Option<String> {
        let mut parts = Vec::new();
        match volume {
            Some(n) => {
                let content = self.find(ResourceKind::CapacityTable, n)?;
                parts.push(format!("**TABLA DE CABIDA - TOMO {}:**\n{}", n, content));
            }
            None => {
                let summaries = self.summaries(ResourceKind::CapacityTable);
                if summaries.is_empty() {
                    return None;
                }
                parts.push(format!(
                    "📊 **RESUMEN DE TABLAS DE CABIDA DISPONIBLES:**\n\n{}",
                    summaries.join("\n\n")
                ));
                parts.push(
                    "\n💡 *Para ver una tabla completa, especifica el tomo: 'tabla de cabida tomo 3'*"
                        .to_string(),
                );
            }
        }
        Some(wrap(
            "📊 **Tabla de Cabida - Distritos de Calificación:**",
            &parts,
            "💡 *Información extraída de las tablas de cabida por tomo*",
        ))
    }

    pub fn resolutions_answer(
        &self,
        volume: Option<u32>,
        theme: Option<ResolutionTheme>,
    ) -> Option<String> {
        let mut parts = Vec::new();
        match volume {
            Some(n) => {
                let content = self.find(ResourceKind::Resolutions, n)?;
                match theme {
                    Some(theme) => {
                        let needle = theme.needle();
                        let lines: Vec<&str> = content
                            .split('\n')
                            .filter(|l| l.to_lowercase().contains(needle))
                            .take(MAX_THEME_LINES)
                            .collect();
                        if lines.is_empty() {
                            return None;
                        }
                        parts.push(format!(
                            "**RESOLUCIONES - TOMO {} - TEMA: {}:**\n{}",
                            n,
                            needle.to_uppercase(),
                            lines.join("\n")
                        ));
                    }
                    None => parts.push(format!(
                        "**RESOLUCIONES - TOMO {}:**\n{}...",
                        n,
                        char_prefix(&content, RESOLUTIONS_PREVIEW_CHARS)
                    )),
                }
            }
            None => {
                let summaries = self.summaries(ResourceKind::Resolutions);
                if summaries.is_empty() {
                    return None;
                }
                parts.push(format!(
                    "📋 **RESUMEN DE RESOLUCIONES DISPONIBLES:**\n\n{}",
                    summaries.join("\n\n")
                ));
                parts.push(
                    "\n💡 *Para ver resoluciones completas, especifica el tomo: 'resoluciones tomo 5'*"
                        .to_string(),
                );
            }
        }
        Some(wrap(
            "📋 **Resoluciones de la Junta de Planificación:**",
            &parts,
            "💡 *Información extraída de las resoluciones organizadas por tomo*",
        ))
    }

    /// Which tomos carry each resource family, plus usage hints.
    pub fn full_index(&self) -> String {
        let mut out = String::from("📚 **ÍNDICE COMPLETO DE RECURSOS DISPONIBLES**\n\n");

        out.push_str("🔄 **FLUJOGRAMAS DISPONIBLES:**\n");
        for kind in FlowchartKind::ALL {
            out.push_str(&format!(
                "• **{}:** Tomos {}\n",
                kind.title(),
                join_volumes(&self.volumes_with(ResourceKind::Flowchart(kind)))
            ));
        }
        out.push('\n');

        out.push_str("📊 **TABLAS DE CABIDA DISPONIBLES:**\n");
        out.push_str(&format!(
            "• Tomos {}\n\n",
            join_volumes(&self.volumes_with(ResourceKind::CapacityTable))
        ));

        out.push_str("📋 **RESOLUCIONES DISPONIBLES:**\n");
        out.push_str(&format!(
            "• Tomos {}\n\n",
            join_volumes(&self.volumes_with(ResourceKind::Resolutions))
        ));

        out.push_str("💡 **CÓMO USAR:**\n");
        out.push_str("• Para flujogramas: 'flujograma terrenos tomo 3'\n");
        out.push_str("• Para tablas: 'tabla de cabida tomo 5'\n");
        out.push_str("• Para resoluciones: 'resoluciones tomo 7'\n");
        out.push_str("• Para todo de un tomo: 'recursos del tomo 2'");
        out
    }

    /// Resource files of one tomo matching `wants`. Flowcharts include every
    /// `.txt` under `Flujogramas/` plus the flat flowchart files.
    pub fn specialized_for_volume(
        &self,
        volume: VolumeId,
        wants: SpecializedWants,
    ) -> Vec<SpecializedResource> {
        let mut out = Vec::new();
        let base = self.volume_dir(volume);

        if wants.flowcharts {
            let dir = base.join(ResourceKind::Flowchart(FlowchartKind::PublicLands).subfolder());
            let mut nested: Vec<PathBuf> = fs::read_dir(&dir)
                .map(|rd| {
                    rd.filter_map(Result::ok)
                        .map(|e| e.path())
                        .filter(|p| p.extension().is_some_and(|x| x == "txt"))
                        .collect()
                })
                .unwrap_or_default();
            nested.sort();

            let flat = FlowchartKind::ALL
                .iter()
                .map(|k| base.join(format!("{}_Tomo_{}.txt", k.file_stem(), volume)));

            for path in nested.into_iter().chain(flat) {
                if let Some(res) = specialized(&path, "Flujograma") {
                    out.push(res);
                }
            }
        }

        for (wanted, kind) in [
            (wants.tables, ResourceKind::CapacityTable),
            (wants.resolutions, ResourceKind::Resolutions),
        ] {
            if !wanted {
                continue;
            }
            if let Some(res) = self
                .candidates(kind, volume)
                .iter()
                .find_map(|p| specialized(p, kind.label()))
            {
                out.push(res);
            }
        }
        out
    }
}

fn specialized(path: &Path, label: &'static str) -> Option<SpecializedResource> {
    let content = read_non_empty(path)?;
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    Some(SpecializedResource {
        label,
        file_name,
        content,
    })
}

fn wrap(header: &str, parts: &[String], footer: &str) -> String {
    let mut out = format!("{header}\n\n");
    for p in parts {
        out.push_str(p);
        out.push_str("\n\n");
    }
    out.push_str("---\n");
    out.push_str(footer);
    out
}
