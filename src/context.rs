// src/context.rs
//! Context assembly: pick the tomo(s) for a legal question and cut each text
//! down to a bounded slice for the prompt.
//!
//! Two corpus sources share the same slicing code with different policies:
//! the 11 tomos (`VolumeCorpus`) and the single superseding regulation
//! (`DocumentCorpus`).

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::classify::{is_simple_question, mentioned_volume_number, requires_analysis};
use crate::config::CorpusMode;
use crate::corpus::{SingleDocument, VolumeId, VolumeStore};
use crate::relevance::{rank_volumes, Relevance};

/// First `n` chars of `s`.
pub fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `len` chars of `s` starting at char `start`.
pub fn char_window(s: &str, start: usize, len: usize) -> &str {
    let from = match s.char_indices().nth(start) {
        Some((idx, _)) => idx,
        None => return "",
    };
    char_prefix(&s[from..], len)
}

/// What to do when no line scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceFallback {
    /// Overlapping char windows; the one with most keyword occurrences wins.
    BestWindow { overlap: usize },
    /// Leading `budget` chars.
    Prefix,
}

/// Line-window slicing parameters.
#[derive(Debug, Clone)]
pub struct SlicePolicy {
    pub budget: usize,
    /// Query words need strictly more chars than this.
    pub min_word_chars: usize,
    /// Count every occurrence of a word in a line instead of presence only.
    pub count_occurrences: bool,
    pub word_weight: usize,
    pub bonus_terms: &'static [&'static str],
    pub bonus_weight: usize,
    pub lines_before: usize,
    pub lines_after: usize,
    pub max_windows: usize,
    pub separator: &'static str,
    /// Skip hits on lines already covered by a chosen window.
    pub dedupe: bool,
    pub fallback: SliceFallback,
}

pub const VOLUME_BUDGET: usize = 4000;
pub const VOLUME_ANALYSIS_BUDGET: usize = 6000;
pub const DOCUMENT_BUDGET: usize = 12000;
pub const WINDOW_OVERLAP: usize = 500;
pub const DOCUMENT_SEPARATOR: &str = "\n\n===SECCIÓN RELEVANTE===\n\n";

const VOLUME_BONUS_TERMS: &[&str] = &[
    "cantidad", "lista", "catálogo", "licencias", "certificaciones", "requisitos",
    "procedimiento", "proceso", "pasos", "resumen",
];
const DOCUMENT_BONUS_TERMS: &[&str] = &[
    "artículo", "sección", "permiso", "certificación", "procedimiento", "requisito",
];

impl SlicePolicy {
    pub fn volume(requires_analysis: bool) -> Self {
        Self {
            budget: if requires_analysis {
                VOLUME_ANALYSIS_BUDGET
            } else {
                VOLUME_BUDGET
            },
            min_word_chars: 2,
            count_occurrences: false,
            word_weight: 3,
            bonus_terms: VOLUME_BONUS_TERMS,
            bonus_weight: 2,
            lines_before: 5,
            lines_after: 20,
            max_windows: 3,
            separator: "\n\n",
            dedupe: false,
            fallback: SliceFallback::BestWindow {
                overlap: WINDOW_OVERLAP,
            },
        }
    }

    pub fn single_document() -> Self {
        Self {
            budget: DOCUMENT_BUDGET,
            min_word_chars: 3,
            count_occurrences: true,
            word_weight: 5,
            bonus_terms: DOCUMENT_BONUS_TERMS,
            bonus_weight: 2,
            lines_before: 15,
            lines_after: 40,
            max_windows: 3,
            separator: DOCUMENT_SEPARATOR,
            dedupe: true,
            fallback: SliceFallback::Prefix,
        }
    }

    fn words(&self, query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > self.min_word_chars)
            .map(str::to_string)
            .collect()
    }

    fn line_score(&self, line_lower: &str, words: &[String]) -> usize {
        let mut score = 0;
        for w in words {
            if self.count_occurrences {
                score += line_lower.matches(w.as_str()).count() * self.word_weight;
            } else if line_lower.contains(w.as_str()) {
                score += self.word_weight;
            }
        }
        for t in self.bonus_terms {
            if line_lower.contains(t) {
                score += self.bonus_weight;
            }
        }
        score
    }

    /// Bounded slice of `text` for `query`. Texts within budget pass through.
    pub fn slice(&self, text: &str, query: &str) -> String {
        if text.chars().count() <= self.budget {
            return text.to_string();
        }

        let words = self.words(query);
        let lines: Vec<&str> = text.split('\n').collect();

        let mut hits: Vec<(usize, usize)> = lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| {
                let s = self.line_score(&line.to_lowercase(), &words);
                (s > 0).then_some((s, i))
            })
            .collect();

        if hits.is_empty() {
            return self.fallback_slice(text, &words);
        }

        // stable: equal scores keep document order
        hits.sort_by(|a, b| b.0.cmp(&a.0));

        let mut covered: HashSet<usize> = HashSet::new();
        let mut windows = Vec::new();
        for (_, i) in hits {
            if self.dedupe && covered.contains(&i) {
                continue;
            }
            let start = i.saturating_sub(self.lines_before);
            let end = (i + self.lines_after).min(lines.len());
            windows.push(lines[start..end].join("\n"));
            if self.dedupe {
                covered.extend(start..end);
            }
            if windows.len() >= self.max_windows {
                break;
            }
        }
        windows.join(self.separator)
    }

    fn fallback_slice(&self, text: &str, words: &[String]) -> String {
        match self.fallback {
            SliceFallback::Prefix => char_prefix(text, self.budget).to_string(),
            SliceFallback::BestWindow { overlap } => {
                let total = text.chars().count();
                let step = self.budget.saturating_sub(overlap).max(1);
                let mut best = char_window(text, 0, self.budget);
                let mut best_score = 0;
                let mut start = 0;
                while start < total {
                    let window = char_window(text, start, self.budget);
                    let lower = window.to_lowercase();
                    let score: usize = words
                        .iter()
                        .map(|w| lower.matches(w.as_str()).count() * 3)
                        .sum();
                    if score > best_score {
                        best_score = score;
                        best = window;
                    }
                    start += step;
                }
                best.to_string()
            }
        }
    }
}

/// Where a passage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRef {
    Volume(VolumeId),
    Document,
}

#[derive(Debug, Clone)]
pub struct Passage {
    pub source: SourceRef,
    pub text: String,
}

/// Outcome of assembling context for one question.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Raw tomo number named in the question, range checked or not.
    pub named_volume: Option<u32>,
    /// Tomos chosen (named or ranked), in prompt order.
    pub volumes: Vec<VolumeId>,
    pub passages: Vec<Passage>,
}

/// Pluggable text source for legal questions.
pub trait CorpusSource: Send + Sync {
    fn mode(&self) -> CorpusMode;
    fn assemble(&self, query: &str) -> Selection;
}

/// How many tomos a question may use and the score they need.
pub fn volume_limits(query: &str) -> (usize, u64) {
    if is_simple_question(query) {
        (1, 3)
    } else if query.split_whitespace().count() <= 8 {
        (2, 5)
    } else {
        (3, 5)
    }
}

/// Top tomos clearing the threshold; the single best one when none does.
pub fn select_volumes(query: &str, ranked: &[Relevance]) -> Vec<VolumeId> {
    let (k, threshold) = volume_limits(query);
    let mut chosen: Vec<VolumeId> = ranked
        .iter()
        .filter(|r| r.score >= threshold)
        .map(|r| r.volume)
        .collect();
    if chosen.is_empty() {
        chosen = ranked.iter().take(1).map(|r| r.volume).collect();
    }
    chosen.truncate(k);
    chosen
}

pub struct VolumeCorpus {
    store: Arc<VolumeStore>,
}

impl VolumeCorpus {
    pub fn new(store: Arc<VolumeStore>) -> Self {
        Self { store }
    }
}

impl CorpusSource for VolumeCorpus {
    fn mode(&self) -> CorpusMode {
        CorpusMode::Volumes
    }

    fn assemble(&self, query: &str) -> Selection {
        let named_volume = mentioned_volume_number(query);
        let volumes = match named_volume {
            Some(n) => VolumeId::new(n).into_iter().collect(),
            None => select_volumes(query, &rank_volumes(query, &self.store.available())),
        };

        let policy = SlicePolicy::volume(requires_analysis(query));
        let passages = volumes
            .iter()
            .filter_map(|id| self.store.get(*id))
            .map(|v| Passage {
                source: SourceRef::Volume(v.id),
                text: policy.slice(&v.text, query),
            })
            .collect::<Vec<_>>();

        debug!(
            named = ?named_volume,
            volumes = ?volumes.iter().map(|v| v.get()).collect::<Vec<_>>(),
            passages = passages.len(),
            "context assembled"
        );
        Selection {
            named_volume,
            volumes,
            passages,
        }
    }
}

pub struct DocumentCorpus {
    document: Option<SingleDocument>,
}

impl DocumentCorpus {
    pub fn new(document: Option<SingleDocument>) -> Self {
        Self {
            document: document.filter(|d| !d.is_empty()),
        }
    }

    pub fn document(&self) -> Option<&SingleDocument> {
        self.document.as_ref()
    }
}

impl CorpusSource for DocumentCorpus {
    fn mode(&self) -> CorpusMode {
        CorpusMode::SingleDocument
    }

    fn assemble(&self, query: &str) -> Selection {
        let passages = self
            .document
            .iter()
            .map(|doc| Passage {
                source: SourceRef::Document,
                text: SlicePolicy::single_document().slice(&doc.text, query),
            })
            .collect();
        Selection {
            passages,
            ..Selection::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(n: u32, score: u64) -> Relevance {
        Relevance {
            volume: VolumeId::new(n).unwrap(),
            score,
            matched: vec![],
        }
    }

    #[test]
    fn char_helpers_respect_multibyte() {
        assert_eq!(char_prefix("año", 2), "añ");
        assert_eq!(char_prefix("año", 10), "año");
        assert_eq!(char_window("calificación", 8, 3), "ció");
        assert_eq!(char_window("abc", 5, 2), "");
    }

    #[test]
    fn short_texts_pass_through() {
        let p = SlicePolicy::volume(false);
        assert_eq!(p.slice("corto", "permiso"), "corto");
    }

    #[test]
    fn volume_slice_keeps_top_windows_around_hits() {
        let mut lines: Vec<String> = (0..400).map(|i| format!("relleno {i:04} xxxxxxxxxxxxxxxx")).collect();
        lines[100] = "Permiso de uso comercial".into();
        lines[300] = "Permiso de construcción".into();
        let text = lines.join("\n");

        let out = SlicePolicy::volume(false).slice(&text, "permiso de construcción");
        let windows: Vec<&str> = out.split("\n\n").collect();
        assert_eq!(windows.len(), 2);
        // line 300 matches two words, so its window comes first
        assert!(windows[0].starts_with("relleno 0295"));
        assert!(windows[0].contains("Permiso de construcción"));
        assert_eq!(windows[0].lines().count(), 25);
        assert!(windows[1].contains("Permiso de uso comercial"));
    }

    #[test]
    fn single_line_hits_and_windowed_fallback() {
        let mut text = "x".repeat(9000);
        text.push_str(" lotificación lotificación ");
        text.push_str(&"y".repeat(3000));
        let out = SlicePolicy::volume(false).slice(&text, "lotificación");
        // a single line with a hit goes through line windows, not the fallback
        assert!(out.contains("lotificación"));

        let no_lines = "z".repeat(10_000);
        let out = SlicePolicy::volume(false).slice(&no_lines, "qqq");
        assert_eq!(out.chars().count(), VOLUME_BUDGET);
    }

    #[test]
    fn document_slice_dedupes_overlapping_windows() {
        let mut lines: Vec<String> = (0..600).map(|i| format!("línea {i:04} ........................")).collect();
        lines[200] = "requisito permiso".into();
        lines[205] = "requisito permiso".into();
        lines[500] = "requisito".into();
        let text = lines.join("\n");

        let out = SlicePolicy::single_document().slice(&text, "¿Cuál es el requisito del permiso?");
        let sections: Vec<&str> = out.split(DOCUMENT_SEPARATOR).collect();
        // hit at 205 is inside the window opened by 200
        assert_eq!(sections.len(), 2);
        assert!(sections[0].starts_with("línea 0185"));
        assert!(sections[1].contains("línea 0485"));
    }

    #[test]
    fn document_fallback_is_prefix() {
        let text = "ñ".repeat(DOCUMENT_BUDGET + 50);
        let out = SlicePolicy::single_document().slice(&text, "nada");
        assert_eq!(out.chars().count(), DOCUMENT_BUDGET);
    }

    #[test]
    fn selection_limits_follow_complexity() {
        let ranked = vec![rel(3, 40), rel(6, 12), rel(1, 4), rel(9, 2)];
        assert_eq!(select_volumes("¿Qué es zonificación?", &ranked).len(), 1);
        let medium = select_volumes("permisos de uso comercial en zona rural", &ranked);
        assert_eq!(medium.iter().map(|v| v.get()).collect::<Vec<_>>(), vec![3, 6]);
        let long = select_volumes(
            "necesito saber los requisitos de permisos de uso para un negocio en zona rural",
            &ranked,
        );
        assert_eq!(long.iter().map(|v| v.get()).collect::<Vec<_>>(), vec![3, 6]);

        let weak = vec![rel(2, 2), rel(4, 1)];
        let fallback = select_volumes("permisos de uso comercial en zona rural", &weak);
        assert_eq!(fallback.iter().map(|v| v.get()).collect::<Vec<_>>(), vec![2]);
        assert!(select_volumes("algo", &[]).is_empty());
    }

    #[test]
    fn volume_corpus_honours_named_volume() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("tomo_4.txt"), "Licencias y certificaciones").unwrap();
        std::fs::write(tmp.path().join("tomo_6.txt"), "Distritos de calificación").unwrap();
        let corpus = VolumeCorpus::new(Arc::new(VolumeStore::new(tmp.path())));

        let sel = corpus.assemble("¿Qué dice el tomo 4?");
        assert_eq!(sel.named_volume, Some(4));
        assert_eq!(sel.passages.len(), 1);
        assert_eq!(sel.passages[0].text, "Licencias y certificaciones");

        let missing = corpus.assemble("tomo 99 por favor");
        assert_eq!(missing.named_volume, Some(99));
        assert!(missing.passages.is_empty());

        let ranked = corpus.assemble("distritos");
        assert_eq!(ranked.volumes.iter().map(|v| v.get()).collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn document_corpus_skips_empty_document() {
        let empty = DocumentCorpus::new(Some(SingleDocument { text: " ".into() }));
        assert!(empty.assemble("permiso").passages.is_empty());

        let doc = DocumentCorpus::new(Some(SingleDocument { text: "Artículo 1".into() }));
        let sel = doc.assemble("permiso");
        assert_eq!(sel.passages[0].source, SourceRef::Document);
        assert_eq!(doc.mode(), CorpusMode::SingleDocument);
    }
}
