// src/glossary.rs
//! Glossary index ("tomo 12"): a line-oriented parser for the glossary markup and
//! the term matching used by definition and comparison questions.
//!
//! Markup accepted:
//!   **Zonificación**: optional inline text
//!   **TÉRMINO**: Zona Costanera
//!   **DEFINICIÓN**: ...            (content, never a heading)
//!   **CATEGORÍA**: Planificación   (closes the entry)
//!
//! Matching, first hit wins per entry, entries scanned in file order:
//!   1) exact (case-insensitive)
//!   2) containment: query >= 5 chars and shorter side >= 30% of the longer
//!   3) token overlap for multi-word queries: >= 80% of query tokens (floor, min 1)

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Entries returned per lookup.
pub const MAX_DEFINITIONS: usize = 5;
/// Content lines kept after a heading.
pub const MAX_BODY_LINES: usize = 9;
pub const MIN_CONTAINMENT_LEN: usize = 5;
const MIN_CONTAINMENT_RATIO: f32 = 0.3;
const MIN_TOKEN_OVERLAP: f32 = 0.8;

pub const GLOSSARY_FOOTER: &str = "---\n💡 *Información extraída del Glosario - Tomo 12*";

const TERM_MARKER: &str = "**TÉRMINO**:";
const CATEGORY_MARKER: &str = "**CATEGORÍA";
const DEFINITION_MARKER: &str = "**DEFINICIÓN";

#[derive(Debug, Clone, PartialEq)]
pub struct GlossaryEntry {
    /// Lowercased term used for matching.
    pub term: String,
    /// Heading line as written in the source.
    pub heading: String,
    pub body: Vec<String>,
    pub category: Option<String>,
}

impl GlossaryEntry {
    /// Heading followed by its content lines.
    pub fn definition(&self) -> String {
        if self.body.is_empty() {
            return self.heading.clone();
        }
        format!("{}\n{}", self.heading, self.body.join("\n"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Containment,
    TokenOverlap,
}

#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
}

impl Glossary {
    /// Missing or unreadable file → empty glossary (lookups return nothing).
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => {
                let g = Self::parse(&raw);
                info!(chars = raw.len(), terms = g.len(), "glossary loaded");
                g
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "glossary not available");
                Self::default()
            }
        }
    }

    pub fn parse(raw: &str) -> Self {
        let lines: Vec<&str> = raw.lines().map(str::trim).collect();
        let mut entries = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let Some(term) = heading_term(line) else {
                continue;
            };

            let mut body = Vec::new();
            let mut category = None;
            for next in lines.iter().skip(i + 1).take(MAX_BODY_LINES) {
                if is_heading(next) {
                    break;
                }
                if next.starts_with(CATEGORY_MARKER) {
                    category = Some(marker_value(next));
                    body.push(next.to_string());
                    break;
                }
                if next.chars().count() > 3 {
                    body.push(next.to_string());
                }
            }

            let entry = GlossaryEntry {
                term,
                heading: line.to_string(),
                body,
                category,
            };
            let has_text = !entry.body.is_empty() || has_inline_text(line);
            if has_text && entry.definition().trim().chars().count() > 10 {
                entries.push(entry);
            }
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    /// Up to `MAX_DEFINITIONS` entries matching `query`, in file order.
    pub fn lookup(&self, query: &str) -> Vec<&GlossaryEntry> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| match_term(&q, &e.term).is_some())
            .take(MAX_DEFINITIONS)
            .collect()
    }

    /// Definition texts for `query`, empty when nothing matches.
    pub fn definitions(&self, query: &str) -> Vec<String> {
        self.lookup(query)
            .into_iter()
            .map(GlossaryEntry::definition)
            .collect()
    }

    /// "Diferencia entre X y Y": both sides looked up independently.
    /// `None` when the message is not a comparison or neither side is known.
    pub fn compare(&self, message: &str) -> Option<String> {
        let lower = message.to_lowercase();
        for re in COMPARISON_PATTERNS.iter() {
            let Some(caps) = re.captures(&lower) else {
                continue;
            };
            let a = clean_term(caps.name("a").map(|m| m.as_str()).unwrap_or_default());
            let b = clean_term(caps.name("b").map(|m| m.as_str()).unwrap_or_default());
            if a.is_empty() || b.is_empty() {
                continue;
            }

            let defs_a = self.definitions(&a);
            let defs_b = self.definitions(&b);
            if defs_a.is_empty() && defs_b.is_empty() {
                continue;
            }

            let mut out = format!("📊 **Comparación entre '{a}' y '{b}':**\n\n");
            for (term, defs) in [(&a, &defs_a), (&b, &defs_b)] {
                if defs.is_empty() {
                    out.push_str(&format!(
                        "**🔹 {}:** No encontrado en el glosario.\n\n",
                        title_case(term)
                    ));
                } else {
                    out.push_str(&format!("**🔹 {}:**\n", title_case(term)));
                    for d in defs {
                        out.push_str(d);
                        out.push_str("\n\n");
                    }
                }
            }
            out.push_str(GLOSSARY_FOOTER);
            return Some(out);
        }
        None
    }

    /// Glossary reply for a message: comparison, then definition phrasing,
    /// then any word longer than 3 characters.
    pub fn answer(&self, message: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let lower = message.to_lowercase();

        if COMPARISON_WORDS.iter().any(|w| lower.contains(w)) {
            if let Some(reply) = self.compare(message) {
                return Some(reply);
            }
        }

        for re in DEFINITION_PATTERNS.iter() {
            let Some(term) = re.captures(&lower).and_then(|c| c.name("t")) else {
                continue;
            };
            let term = clean_term(term.as_str());
            if term.is_empty() {
                continue;
            }
            let defs = self.definitions(&term);
            if defs.is_empty() {
                continue;
            }
            let mut out = format!(
                "📚 **Definición(es) encontrada(s) para '{}':**\n\n",
                title_case(&term)
            );
            for (i, d) in defs.iter().enumerate() {
                out.push_str(&format!("**{}.** {}\n\n", i + 1, d));
            }
            out.push_str(GLOSSARY_FOOTER);
            return Some(out);
        }

        for word in keywords(message) {
            let defs = self.definitions(&word);
            if defs.is_empty() {
                continue;
            }
            let mut out = format!(
                "📚 **Término relacionado encontrado: '{}':**\n\n",
                title_case(&word)
            );
            for (i, d) in defs.iter().take(2).enumerate() {
                out.push_str(&format!("**{}.** {}\n\n", i + 1, d));
            }
            out.push_str(GLOSSARY_FOOTER);
            return Some(out);
        }

        None
    }

    /// Definitions for the first message word with one or two glossary hits,
    /// formatted as supporting context for a legal prompt.
    pub fn supporting_definitions(&self, message: &str) -> Option<String> {
        for word in keywords(&message.to_lowercase()) {
            let defs = self.definitions(&word);
            if !defs.is_empty() && defs.len() <= 2 {
                let mut out = String::from("**Definiciones relevantes del glosario:**\n");
                for d in defs {
                    out.push_str(&d);
                    out.push('\n');
                }
                return Some(out);
            }
        }
        None
    }
}

/// Decide whether lowercased `query` matches lowercased `term`.
pub fn match_term(query: &str, term: &str) -> Option<MatchKind> {
    if term.is_empty() {
        return None;
    }
    if query == term {
        return Some(MatchKind::Exact);
    }

    let q_len = query.chars().count();
    let t_len = term.chars().count();

    if q_len >= MIN_CONTAINMENT_LEN && (term.contains(query) || query.contains(term)) {
        let (short, long) = if q_len <= t_len { (q_len, t_len) } else { (t_len, q_len) };
        if short as f32 / long as f32 >= MIN_CONTAINMENT_RATIO {
            return Some(MatchKind::Containment);
        }
    }

    if q_len >= MIN_CONTAINMENT_LEN && query.contains(' ') {
        let q_tokens: Vec<&str> = query
            .split_whitespace()
            .filter(|t| t.chars().count() > 2)
            .collect();
        let t_tokens: Vec<&str> = term.split_whitespace().collect();
        let matched = q_tokens
            .iter()
            .filter(|q| {
                t_tokens.iter().any(|t| {
                    q == &t || (q.chars().count() >= MIN_CONTAINMENT_LEN && t.contains(*q))
                })
            })
            .count();
        let needed = ((q_tokens.len() as f32 * MIN_TOKEN_OVERLAP).floor() as usize).max(1);
        if matched >= needed {
            return Some(MatchKind::TokenOverlap);
        }
    }

    None
}

/* ----------------------------
Markup helpers
---------------------------- */

fn is_marker(line: &str) -> bool {
    line.starts_with(CATEGORY_MARKER) || line.starts_with(DEFINITION_MARKER)
}

fn is_heading(line: &str) -> bool {
    line.starts_with(TERM_MARKER) || (line.starts_with("**") && line.contains("**:") && !is_marker(line))
}

fn heading_term(line: &str) -> Option<String> {
    if !is_heading(line) {
        return None;
    }
    let term = if let Some(rest) = line.strip_prefix(TERM_MARKER) {
        rest.trim().to_lowercase()
    } else {
        let inner = &line[2..];
        let end = inner.find("**:")?;
        inner[..end].trim().to_lowercase()
    };
    if term.is_empty() {
        None
    } else {
        Some(term)
    }
}

fn has_inline_text(line: &str) -> bool {
    if line.starts_with(TERM_MARKER) {
        return false;
    }
    line.split_once("**:")
        .map(|(_, rest)| rest.trim().chars().count() > 3)
        .unwrap_or(false)
}

fn marker_value(line: &str) -> String {
    line.split_once(':')
        .map(|(_, v)| v)
        .unwrap_or_default()
        .trim_matches(|c: char| c == '*' || c.is_whitespace())
        .to_string()
}

/* ----------------------------
Question parsing
---------------------------- */

static COMPARISON_WORDS: &[&str] = &["diferencia", "diferencias", "comparar", "comparación"];

static COMPARISON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"qu[eé]\s+diferencia\s+hay\s+entre\s+(?P<a>.+?)\s+y\s+(?P<b>.+)",
        r"diferencias?\s+entre\s+(?P<a>.+?)\s+y\s+(?P<b>.+)",
        r"comparar\s+(?P<a>.+?)\s+y\s+(?P<b>.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("comparison regex"))
    .collect()
});

static DEFINITION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"qu[eé]\s+es\s+(?P<t>.+)",
        r"qu[eé]\s+significa\s+(?P<t>.+)",
        r"define\s+(?P<t>.+)",
        r"definici[oó]n\s+de\s+(?P<t>.+)",
        r"significado\s+de\s+(?P<t>.+)",
        r"expl[ií]came\s+(?P<t>.+)",
        r"explica\s+(?P<t>.+)",
        r"(?P<t>.+?)\s+significa\b",
        r"(?P<t>.+?)\s+es\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("definition regex"))
    .collect()
});

const LEADING_WORDS: &[&str] = &["el", "la", "los", "las", "lo", "un", "una", "unos", "unas"];

/// Strip surrounding punctuation and leading articles from a captured term.
fn clean_term(raw: &str) -> String {
    let trimmed = trim_punctuation(raw);
    let mut words: Vec<&str> = trimmed.split_whitespace().collect();
    while words.len() > 1 && LEADING_WORDS.contains(&words[0]) {
        words.remove(0);
    }
    words.join(" ")
}

fn trim_punctuation(s: &str) -> &str {
    s.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Message words longer than 3 characters, punctuation stripped.
fn keywords(message: &str) -> Vec<String> {
    message
        .split_whitespace()
        .map(trim_punctuation)
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

/// Capitalise the first letter of every alphabetic run.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
GLOSARIO DE TÉRMINOS

**Zonificación**:
Instrumento de planificación que clasifica los terrenos en distritos.
Regula los usos permitidos en cada distrito.
**CATEGORÍA**: Planificación

**TÉRMINO**: Zona Costanera
**DEFINICIÓN**: Franja de terreno costero sujeta a protección especial.

**Lotificación**: División de un predio en dos o más partes para su venta.

**Uso**:
Propósito para el cual se utiliza una estructura o terreno.

**Distrito de Calificación Residencial**:
Distrito destinado principalmente a viviendas.
";

    fn g() -> Glossary {
        Glossary::parse(SAMPLE)
    }

    #[test]
    fn parser_builds_structured_entries() {
        let g = g();
        let terms: Vec<&str> = g.entries().iter().map(|e| e.term.as_str()).collect();
        assert_eq!(
            terms,
            vec![
                "zonificación",
                "zona costanera",
                "lotificación",
                "uso",
                "distrito de calificación residencial"
            ]
        );
        let z = &g.entries()[0];
        assert_eq!(z.category.as_deref(), Some("Planificación"));
        assert_eq!(z.body.len(), 3);
        assert!(z.definition().starts_with("**Zonificación**:"));
        // Inline definitions survive without a body.
        assert!(g.entries()[2].body.is_empty());
    }

    #[test]
    fn exact_lookup_returns_heading() {
        let g = g();
        let hits = g.definitions("ZONIFICACIÓN");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].contains("**Zonificación**:"));
    }

    #[test]
    fn containment_requires_five_chars() {
        // "uso" is exact for the entry, but never a containment hit elsewhere.
        assert_eq!(match_term("uso", "uso"), Some(MatchKind::Exact));
        assert_eq!(match_term("zona", "zona costanera"), None);
        assert_eq!(match_term("costa", "zona costanera"), Some(MatchKind::Containment));
    }

    #[test]
    fn containment_ratio_rejects_tiny_overlap() {
        let long = "distrito de calificación residencial extendido para viviendas";
        assert_eq!(match_term("vivie", long), None);
        assert_eq!(
            match_term("calificación residencial", "distrito de calificación residencial"),
            Some(MatchKind::Containment)
        );
    }

    #[test]
    fn token_overlap_for_multi_word_queries() {
        assert_eq!(
            match_term("distrito residencial", "distrito de calificación residencial"),
            Some(MatchKind::TokenOverlap)
        );
        // 1 of 3 tokens < floor(2.4)
        assert_eq!(
            match_term("distrito comercial industrial", "distrito de calificación residencial"),
            None
        );
    }

    #[test]
    fn lookup_caps_results() {
        let mut raw = String::new();
        for i in 0..8 {
            raw.push_str(&format!("**Permiso tipo {i}**:\nTexto del permiso número {i}.\n\n"));
        }
        let g = Glossary::parse(&raw);
        assert_eq!(g.lookup("permiso").len(), MAX_DEFINITIONS);
    }

    #[test]
    fn definition_question_answers_from_glossary() {
        let reply = g().answer("¿Qué es zonificación?").expect("definition");
        assert!(reply.contains("Zonificación"));
        assert!(reply.contains("**Zonificación**:"));
        assert!(reply.ends_with(GLOSSARY_FOOTER));
    }

    #[test]
    fn comparison_reports_each_side() {
        let reply = g()
            .compare("¿Cuál es la diferencia entre zonificación y lotificación?")
            .expect("comparison");
        assert!(reply.contains("**🔹 Zonificación:**"));
        assert!(reply.contains("**🔹 Lotificación:**"));

        let half = g()
            .compare("diferencia entre zonificación y hipoteca")
            .expect("one side known");
        assert!(half.contains("**🔹 Hipoteca:** No encontrado en el glosario."));

        assert!(g().compare("diferencia entre hipoteca y alquiler").is_none());
    }

    #[test]
    fn keyword_fallback_and_supporting_context() {
        let g = g();
        let reply = g.answer("Necesito ayuda con lotificación").expect("fallback");
        assert!(reply.contains("Término relacionado encontrado: 'Lotificación'"));

        let ctx = g.supporting_definitions("permiso de lotificación").expect("context");
        assert!(ctx.contains("**Lotificación**:"));
        assert!(g.supporting_definitions("nada aquí").is_none());
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("zona costanera"), "Zona Costanera");
        assert_eq!(title_case("uso-mixto"), "Uso-Mixto");
    }
}
