// src/classify.rs
//! Heuristic message classification.
//!
//! Three independent signals are derived from one message:
//! - `QuestionKind`: ordered rule list, first match wins, `General` otherwise
//! - legal flag: any legal-vocabulary word, or the token "tomo"
//! - `ResourceRequest`: index / flowchart / capacity table / resolutions / "tomo N"
//!
//! `Intent` folds the three into the single category the chat pipeline acts on.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::corpus::VolumeId;
use crate::resources::FlowchartKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Comparison,
    Definition,
    /// Requirements/procedure questions (single-document rule set only).
    Requirements,
    Permits,
    Construction,
    Planning,
    Environmental,
    General,
}

impl QuestionKind {
    /// Label used in reply types (`legal-{label}`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Comparison => "comparacion",
            Self::Definition => "glosario",
            Self::Requirements => "requisitos_procedimientos",
            Self::Permits => "permisos",
            Self::Construction => "construccion",
            Self::Planning => "planificacion",
            Self::Environmental => "ambiental",
            Self::General => "general",
        }
    }

    /// Subtypes whose legal prompt gets glossary definitions as support.
    pub fn is_legal_subtype(self) -> bool {
        matches!(
            self,
            Self::Permits | Self::Construction | Self::Planning | Self::Environmental
        )
    }

    /// Kinds that always consult the glossary, legal flag or not.
    pub fn consults_glossary(self) -> bool {
        !matches!(self, Self::General | Self::Requirements)
    }
}

/// One classification rule: any keyword (substring of the lowercased message) → kind.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: QuestionKind,
    pub any_of: &'static [&'static str],
}

impl Rule {
    pub fn matches(&self, lower: &str) -> bool {
        self.any_of.iter().any(|k| lower.contains(k))
    }
}

const COMPARISON: &[&str] = &["diferencia", "diferencias", "comparar", "comparación"];
const DEFINITION: &[&str] = &[
    "qué es", "que es", "define", "definición", "definicion", "significado", "explica",
    "explícame", "explicame", "concepto", "término", "termino", "significa",
];
const REQUIREMENTS: &[&str] = &[
    "requisito", "requisitos", "proceso", "procedimiento", "pasos", "como", "cómo", "necesito",
    "solicitar", "obtener", "tramitar", "aplicar",
];
const PERMITS: &[&str] = &["permiso", "autorización", "licencia", "trámite"];
const CONSTRUCTION: &[&str] = &["construcción", "edificar", "estructura", "obra"];
const PLANNING: &[&str] = &["plan", "zonificación", "ordenación", "uso de suelo"];
const ENVIRONMENTAL: &[&str] = &["ambiental", "conservación", "aguas", "desperdicios"];

/// Ordered rules; the first rule whose keywords appear decides the kind.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Rules used with the multi-tomo corpus.
    pub fn volumes() -> Self {
        Self {
            rules: vec![
                Rule { kind: QuestionKind::Comparison, any_of: COMPARISON },
                Rule { kind: QuestionKind::Definition, any_of: DEFINITION },
                Rule { kind: QuestionKind::Permits, any_of: PERMITS },
                Rule { kind: QuestionKind::Construction, any_of: CONSTRUCTION },
                Rule { kind: QuestionKind::Planning, any_of: PLANNING },
                Rule { kind: QuestionKind::Environmental, any_of: ENVIRONMENTAL },
            ],
        }
    }

    /// Rules used with the single superseding document: requirement/procedure
    /// phrasing outranks definitions.
    pub fn single_document() -> Self {
        let mut set = Self::volumes();
        set.rules.insert(
            1,
            Rule { kind: QuestionKind::Requirements, any_of: REQUIREMENTS },
        );
        set
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Total: always yields exactly one kind.
    pub fn classify(&self, message: &str) -> QuestionKind {
        let lower = message.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(&lower))
            .map(|r| r.kind)
            .unwrap_or(QuestionKind::General)
    }
}

const LEGAL_WORDS: &[&str] = &[
    "permiso", "planificación", "construcción", "zonificación", "desarrollo", "urbanización",
    "reglamento", "licencia", "certificación", "calificación", "tomo", "junta", "ambiental",
    "infraestructura", "conservación", "histórico", "querella", "edificabilidad", "lotificación",
];

/// True when the message uses legal vocabulary or names a tomo.
pub fn is_legal(message: &str) -> bool {
    let lower = message.to_lowercase();
    LEGAL_WORDS.iter().any(|w| lower.contains(w))
}

static TOMO_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"tomo\s*(\d+)").expect("tomo regex"));
static TOMO_NUMBER_SPACED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"tomo\s+(\d+)").expect("tomo regex"));

/// "tomo 5" / "tomo5" → 5 (raw number, not range checked).
pub fn mentioned_volume_number(message: &str) -> Option<u32> {
    TOMO_NUMBER
        .captures(&message.to_lowercase())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// "tomo 5" only; resource lookups need the space, so "tomo5" names no tomo.
pub fn requested_volume_number(message: &str) -> Option<u32> {
    TOMO_NUMBER_SPACED
        .captures(&message.to_lowercase())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Like `mentioned_volume_number`, restricted to the 1..=11 range.
pub fn mentioned_volume(message: &str) -> Option<VolumeId> {
    mentioned_volume_number(message).and_then(VolumeId::new)
}

/// A request for a structured resource rather than free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRequest {
    Index,
    Flowchart(FlowchartKind),
    CapacityTable,
    Resolutions,
    /// Only names a tomo; served by full-text retrieval pinned to that tomo.
    Volume(u32),
}

const INDEX_WORDS: &[&str] = &[
    "índice", "indice", "lista completa", "todos los recursos", "qué recursos",
    "recursos disponibles",
];
const FLOWCHART_WORDS: &[&str] = &["flujograma", "proceso", "trámite", "procedimiento"];
const PUBLIC_LAND_WORDS: &[&str] = &["terreno", "terrenos", "público", "públicos"];
const ZONING_CHANGE_WORDS: &[&str] = &["calificación", "cambio", "cambios"];
const HISTORIC_WORDS: &[&str] = &["histórico", "historicos", "sitio", "sitios"];
const TABLE_WORDS: &[&str] = &["cabida", "tabla", "distrito", "calificación"];
const TABLE_QUALIFIERS: &[&str] = &["mínima", "máxima", "tabla"];
const RESOLUTION_WORDS: &[&str] = &["resolución", "resoluciones"];

fn any_in(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lower.contains(w))
}

/// Detect a structured-resource request; ordered, first match wins.
pub fn detect_resource_request(message: &str) -> Option<ResourceRequest> {
    let lower = message.to_lowercase();

    if any_in(&lower, INDEX_WORDS) {
        return Some(ResourceRequest::Index);
    }

    if any_in(&lower, FLOWCHART_WORDS) {
        if any_in(&lower, PUBLIC_LAND_WORDS) {
            return Some(ResourceRequest::Flowchart(FlowchartKind::PublicLands));
        } else if any_in(&lower, ZONING_CHANGE_WORDS) {
            return Some(ResourceRequest::Flowchart(FlowchartKind::ZoningChanges));
        } else if any_in(&lower, HISTORIC_WORDS) {
            return Some(ResourceRequest::Flowchart(FlowchartKind::HistoricSites));
        }
    }

    if any_in(&lower, TABLE_WORDS) && any_in(&lower, TABLE_QUALIFIERS) {
        return Some(ResourceRequest::CapacityTable);
    }

    if any_in(&lower, RESOLUTION_WORDS) {
        return Some(ResourceRequest::Resolutions);
    }

    requested_volume_number(&lower).map(ResourceRequest::Volume)
}

const COMPLEX_WORDS: &[&str] = &[
    "todos", "lista", "cantidad", "cuantos", "cuántos", "comparar", "diferencia", "análisis",
    "resumen", "procedimiento completo", "proceso completo",
];
const SIMPLE_WORDS: &[&str] = &[
    "qué es", "que es", "define", "definición", "significa", "cómo se", "como se", "para qué",
    "para que",
];

/// Short or definition-style questions only need the single best tomo.
pub fn is_simple_question(message: &str) -> bool {
    let lower = message.to_lowercase();
    if any_in(&lower, COMPLEX_WORDS) {
        return false;
    }
    if any_in(&lower, SIMPLE_WORDS) {
        return true;
    }
    message.split_whitespace().count() <= 5
}

const ANALYSIS_WORDS: &[&str] = &[
    "resumen", "comparar", "diferencia", "análisis", "explicar", "procedimiento", "proceso",
    "pasos", "cómo", "cuándo", "dónde", "requisitos", "lista", "todos los", "cuantas", "cuántas",
    "cantidad", "número", "listame",
];

/// Questions that deserve the larger per-tomo context budget.
pub fn requires_analysis(message: &str) -> bool {
    any_in(&message.to_lowercase(), ANALYSIS_WORDS)
}

/// The single category a message is handled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Definition,
    Comparison,
    ResourceIndex,
    ResourceFlowchart(FlowchartKind),
    ResourceTable,
    ResourceResolution,
    LegalGeneral(QuestionKind),
    General,
}

/// All signals for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: QuestionKind,
    pub legal: bool,
    pub resource: Option<ResourceRequest>,
}

impl Classification {
    pub fn of(message: &str, rules: &RuleSet) -> Self {
        Self {
            kind: rules.classify(message),
            legal: is_legal(message),
            resource: detect_resource_request(message),
        }
    }

    /// Resource requests first, then glossary kinds, then legal vs general.
    pub fn intent(&self) -> Intent {
        match self.resource {
            Some(ResourceRequest::Index) => return Intent::ResourceIndex,
            Some(ResourceRequest::Flowchart(k)) => return Intent::ResourceFlowchart(k),
            Some(ResourceRequest::CapacityTable) => return Intent::ResourceTable,
            Some(ResourceRequest::Resolutions) => return Intent::ResourceResolution,
            Some(ResourceRequest::Volume(_)) | None => {}
        }
        match self.kind {
            QuestionKind::Definition => Intent::Definition,
            QuestionKind::Comparison => Intent::Comparison,
            k if self.legal => Intent::LegalGeneral(k),
            _ => Intent::General,
        }
    }
}
