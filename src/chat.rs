// src/chat.rs
//! Chat pipeline: classify a message and route it to the matching answer source.
//!
//! Order of precedence:
//! 1. beta gate and empty-message checks
//! 2. fixed replies ("cuántos tomos")
//! 3. structured-resource requests (multi-tomo corpus only); in single-document
//!    mode, requirement/procedure questions go straight to the regulation
//! 4. glossary answers for definition and comparison questions
//! 5. legal questions → corpus context + generator, one call per source
//! 6. everything else → per-session conversation with the generator

use chrono::{DateTime, Local};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::beta::{BetaGate, BetaStatus};
use crate::cache::{query_key, LruCache};
use crate::classify::{
    requested_volume_number, Classification, Intent, QuestionKind, ResourceRequest, RuleSet,
};
use crate::config::ai::AiConfig;
use crate::config::{AppConfig, CorpusMode};
use crate::context::{CorpusSource, DocumentCorpus, SourceRef, VolumeCorpus};
use crate::corpus::{SingleDocument, VolumeStore};
use crate::generator::{DynGenerator, GenerationRequest};
use crate::glossary::Glossary;
use crate::history::InteractionLog;
use crate::metrics::{record_generator_skip, record_reply};
use crate::prompts;
use crate::resources::{ResolutionTheme, ResourceLocator, SpecializedWants};
use crate::session::{ChatMessage, InMemorySessionStore, SessionStore};

/// Generated answers this short carry no content and are dropped.
pub const MIN_ANSWER_CHARS: usize = 51;
/// Token cap for single-document answers.
pub const DOCUMENT_MAX_TOKENS: u32 = 1500;

pub const KIND_INFO: &str = "info";
pub const KIND_RESOURCE: &str = "recurso_especifico";
pub const KIND_COMPARISON: &str = "comparacion";
pub const KIND_GLOSSARY: &str = "glosario";
pub const KIND_GENERAL: &str = "general";
pub const KIND_DOCUMENT_REQUIREMENTS: &str = "requisitos_reglamento";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    pub kind: String,
}

impl ChatReply {
    fn new(response: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Mensaje vacío")]
    EmptyMessage,
    #[error("La versión beta ha expirado")]
    BetaExpired { message: String },
    #[error("Error interno del servidor")]
    Internal(#[source] anyhow::Error),
}

const VOLUME_COUNT_WORDS: &[&str] = &["cuantos tomos", "cuántos tomos"];
const TITLE_WORDS: &[&str] = &[
    "titulo", "título", "títulos", "titulos", "nombre", "nombres", "llamar", "llama", "indices",
    "indice", "índice", "índices",
];
const VOLUME_WORDS: &[&str] = &["tomo", "tomos", "11 tomos", "once tomos", "todos los tomos", "cada tomo"];
const VOLUME_SET_WORDS: &[&str] = &["tomos", "once tomos", "cada tomo"];
const LISTING_WORDS: &[&str] = &["dame", "dime", "muestra", "muéstra", "lista", "listado", "cuales", "cuáles"];
const DOCUMENT_INFO_WORDS: &[&str] = &[
    "que documentos", "qué documentos", "que tienes", "qué tienes", "documentación",
];
const DOCUMENT_WORDS: &[&str] = &["documento", "documentos", "reglamento", "regulación"];

fn contains_any(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lower.contains(w))
}

/// "títulos de los tomos", "dame la lista de tomos".
fn asks_for_volume_titles(lower: &str) -> bool {
    (contains_any(lower, TITLE_WORDS) && contains_any(lower, VOLUME_WORDS))
        || (contains_any(lower, LISTING_WORDS) && contains_any(lower, VOLUME_SET_WORDS))
}

/// "¿qué documentos tienes?", "muéstrame el reglamento".
fn asks_for_document_info(lower: &str) -> bool {
    contains_any(lower, DOCUMENT_INFO_WORDS)
        || (contains_any(lower, LISTING_WORDS) && contains_any(lower, DOCUMENT_WORDS))
}

/// Everything needed to answer chat messages.
pub struct ChatService {
    mode: CorpusMode,
    rules: RuleSet,
    glossary: Arc<Glossary>,
    resources: ResourceLocator,
    corpus: Arc<dyn CorpusSource>,
    document_chars: Option<usize>,
    generator: DynGenerator,
    sessions: Arc<dyn SessionStore>,
    answers: LruCache<String, String>,
    log: InteractionLog,
    beta: BetaGate,
    legal_temperature: f32,
    general_temperature: f32,
}

impl ChatService {
    /// Load glossary and corpus per config. `started` anchors a duration-based beta window.
    pub fn from_config(
        cfg: &AppConfig,
        ai: &AiConfig,
        generator: DynGenerator,
        started: DateTime<Local>,
    ) -> anyhow::Result<Self> {
        let glossary = Arc::new(Glossary::load(cfg.glossary_path()));

        let (corpus, document_chars): (Arc<dyn CorpusSource>, Option<usize>) = match cfg.corpus.mode {
            CorpusMode::Volumes => (
                Arc::new(VolumeCorpus::new(Arc::new(VolumeStore::new(&cfg.data_dir)))),
                None,
            ),
            CorpusMode::SingleDocument => {
                let doc = match SingleDocument::load(cfg.document_path()) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        warn!(error = %e, "regulation document unavailable");
                        None
                    }
                };
                let corpus = DocumentCorpus::new(doc);
                let chars = corpus.document().map(|d| d.text.chars().count());
                (Arc::new(corpus), chars)
            }
        };

        let rules = match cfg.corpus.mode {
            CorpusMode::Volumes => RuleSet::volumes(),
            CorpusMode::SingleDocument => RuleSet::single_document(),
        };

        info!(
            mode = ?cfg.corpus.mode,
            glossary_terms = glossary.len(),
            data_dir = %cfg.data_dir.display(),
            "chat service ready"
        );

        Ok(Self {
            mode: cfg.corpus.mode,
            rules,
            glossary,
            resources: ResourceLocator::new(&cfg.data_dir),
            corpus,
            document_chars,
            generator,
            sessions: Arc::new(InMemorySessionStore::new(prompts::CONVERSATION_SYSTEM_PROMPT)),
            answers: LruCache::new(cfg.cache.capacity),
            log: InteractionLog::new(&cfg.log_path),
            beta: BetaGate::new(cfg.beta_expiration(started)?),
            legal_temperature: ai.legal_temperature,
            general_temperature: ai.general_temperature,
        })
    }

    pub fn with_beta(mut self, beta: BetaGate) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn beta(&self) -> &BetaGate {
        &self.beta
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn mode(&self) -> CorpusMode {
        self.mode
    }

    /// Answer one message for `session`.
    pub async fn handle(&self, session: &str, message: &str) -> Result<ChatReply, ChatError> {
        if let BetaStatus::Expired { expires_at } = self.beta.status() {
            return Err(ChatError::BetaExpired {
                message: BetaGate::expired_message(&expires_at),
            });
        }

        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        debug!(text = message, "chat message");
        let reply = self.route(session, message).await?;

        if let Err(e) = self.log.append(message, &reply.response) {
            warn!(error = %e, path = %self.log.path().display(), "interaction log append failed");
        }
        record_reply(&reply.kind);
        info!(kind = %reply.kind, chars = reply.response.chars().count(), "chat reply");
        Ok(reply)
    }

    async fn route(&self, session: &str, message: &str) -> Result<ChatReply, ChatError> {
        let lower = message.to_lowercase();

        if self.mode == CorpusMode::Volumes && contains_any(&lower, VOLUME_COUNT_WORDS) {
            return Ok(ChatReply::new(prompts::VOLUME_COUNT_REPLY, KIND_INFO));
        }

        let mut cls = Classification::of(message, &self.rules);
        if self.mode == CorpusMode::SingleDocument {
            cls.resource = None;
        }

        match cls.intent() {
            Intent::ResourceIndex => {
                return Ok(ChatReply::new(self.resources.full_index(), KIND_RESOURCE));
            }
            Intent::ResourceFlowchart(_) | Intent::ResourceTable | Intent::ResourceResolution => {
                let response = cls
                    .resource
                    .and_then(|r| self.resource_answer(r, message))
                    .unwrap_or_else(|| prompts::NO_RESOURCES_REPLY.to_string());
                return Ok(ChatReply::new(response, KIND_RESOURCE));
            }
            _ => {}
        }

        // requirements and procedures always go to the superseding regulation
        if self.mode == CorpusMode::SingleDocument && cls.kind == QuestionKind::Requirements {
            let response = self.document_answer(message, &lower, cls.kind).await;
            return Ok(ChatReply::new(response, KIND_DOCUMENT_REQUIREMENTS));
        }

        let glossary_reply = if cls.legal || cls.kind.consults_glossary() {
            self.glossary.answer(message)
        } else {
            None
        };

        match (cls.kind, &glossary_reply) {
            (QuestionKind::Comparison, Some(g)) => {
                return Ok(ChatReply::new(g.clone(), KIND_COMPARISON));
            }
            (QuestionKind::Definition, Some(g)) => {
                return Ok(ChatReply::new(g.clone(), KIND_GLOSSARY));
            }
            _ => {}
        }

        if cls.legal {
            let mut response = match self.mode {
                CorpusMode::Volumes => self.volume_answer(message, &lower, cls.kind).await,
                CorpusMode::SingleDocument => self.document_answer(message, &lower, cls.kind).await,
            };
            if let Some(g) = glossary_reply {
                if !response.contains(&g) {
                    response = format!("{g}\n\n---\n\n{response}");
                }
            }
            return Ok(ChatReply::new(response, format!("legal-{}", cls.kind.label())));
        }

        self.general_answer(session, message).await
    }

    fn resource_answer(&self, request: ResourceRequest, message: &str) -> Option<String> {
        let volume = requested_volume_number(message);
        match request {
            ResourceRequest::Index => Some(self.resources.full_index()),
            ResourceRequest::Flowchart(kind) => self.resources.flowchart_answer(kind, volume),
            ResourceRequest::CapacityTable => self.resources.table_answer(volume),
            ResourceRequest::Resolutions => self
                .resources
                .resolutions_answer(volume, ResolutionTheme::detect(message)),
            ResourceRequest::Volume(_) => None,
        }
    }

    /// Generator call for a legal source; `None` when it fails or says nothing.
    async fn generate_source(&self, label: &str, request: GenerationRequest) -> Option<String> {
        match self.generator.generate(request).await {
            Ok(text) if text.chars().count() >= MIN_ANSWER_CHARS => Some(text),
            Ok(_) => {
                debug!(source = label, "answer too short, skipped");
                record_generator_skip();
                None
            }
            Err(e) => {
                warn!(source = label, error = %e, "generation failed, source skipped");
                record_generator_skip();
                None
            }
        }
    }

    async fn volume_answer(&self, message: &str, lower: &str, kind: QuestionKind) -> String {
        if asks_for_volume_titles(lower) {
            return prompts::VOLUME_TITLES_REPLY.to_string();
        }

        let selection = self.corpus.assemble(message);
        let mut parts: Vec<String> = Vec::new();

        let wants = SpecializedWants::detect(message);
        if wants.any() {
            for volume in &selection.volumes {
                for res in self.resources.specialized_for_volume(*volume, wants) {
                    let request = GenerationRequest::new(prompts::resource_messages(
                        res.label,
                        &res.content,
                        message,
                    ))
                    .temperature(self.legal_temperature);
                    if let Some(text) = self.generate_source(&res.file_name, request).await {
                        parts.push(format!(
                            "\n📋 **{} Especializado - {}**:\n{}",
                            res.label, res.file_name, text
                        ));
                    }
                }
            }
        }

        let glossary_context = if kind.is_legal_subtype() {
            self.glossary.supporting_definitions(message)
        } else {
            None
        };

        for passage in &selection.passages {
            let SourceRef::Volume(volume) = passage.source else {
                continue;
            };
            let request = GenerationRequest::new(prompts::volume_messages(
                volume.get(),
                &passage.text,
                message,
                glossary_context.as_deref(),
            ))
            .temperature(self.legal_temperature);
            if let Some(text) = self
                .generate_source(&format!("tomo_{volume}"), request)
                .await
            {
                parts.push(format!("\n📘 **Respuesta basada en Tomo {volume}**:\n{text}"));
            }
        }

        if parts.is_empty() {
            return prompts::VOLUME_RETRY_REPLY.to_string();
        }

        let mut out = parts.join("\n");
        if selection.named_volume.is_none() && selection.volumes.len() < 3 {
            let ids: Vec<u8> = selection.volumes.iter().map(|v| v.get()).collect();
            out.push_str(&prompts::search_footer(&ids));
        }
        out
    }

    async fn document_answer(&self, message: &str, lower: &str, kind: QuestionKind) -> String {
        if asks_for_document_info(lower) {
            return prompts::document_info_reply(self.document_chars);
        }
        if self.document_chars.is_none() {
            return prompts::DOCUMENT_UNAVAILABLE_REPLY.to_string();
        }

        let key = query_key(message);
        if let Some(hit) = self.answers.get(&key) {
            debug!("answer cache hit");
            return hit;
        }

        let Some(passage) = self.corpus.assemble(message).passages.into_iter().next() else {
            return prompts::DOCUMENT_NOT_FOUND_REPLY.to_string();
        };

        let glossary_context = if kind.is_legal_subtype() {
            self.glossary.supporting_definitions(message)
        } else {
            None
        };
        let request = GenerationRequest::new(prompts::document_messages(
            &passage.text,
            message,
            glossary_context.as_deref(),
        ))
        .temperature(self.legal_temperature)
        .max_tokens(DOCUMENT_MAX_TOKENS);

        match self.generate_source("documento", request).await {
            Some(text) => {
                let answer = prompts::document_answer(&text);
                self.answers.put(key, answer.clone());
                answer
            }
            None => prompts::DOCUMENT_NOT_FOUND_REPLY.to_string(),
        }
    }

    async fn general_answer(&self, session: &str, message: &str) -> Result<ChatReply, ChatError> {
        let conversation = self.sessions.get_or_create(session);
        let mut conv = conversation.lock().await;
        conv.push(ChatMessage::user(message));

        let request = GenerationRequest::new(conv.messages().to_vec())
            .temperature(self.general_temperature);
        match self.generator.generate(request).await {
            Ok(text) => {
                conv.push(ChatMessage::assistant(text.clone()));
                Ok(ChatReply::new(text, KIND_GENERAL))
            }
            Err(e) => {
                conv.pop_user();
                Err(ChatError::Internal(e))
            }
        }
    }
}
