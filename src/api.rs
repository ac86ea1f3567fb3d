use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_axum::axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error};
use uuid::Uuid;

use crate::beta::{format_spanish_date, BetaGate, BetaStatus};
use crate::chat::{ChatError, ChatService};

pub const SESSION_COOKIE: &str = "conversation_id";
pub const INVALID_REQUEST_ERROR: &str = "Solicitud inválida";

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub service_name: String,
    pub static_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let assets = Router::new()
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .route_service("/favicon.ico", ServeFile::new(state.static_dir.join("favicon.ico")))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ));

    Router::new()
        .route("/", get(index))
        .route("/v2", get(index))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/nueva-conversacion", post(new_conversation))
        .with_state(state)
        .merge(assets)
        .layer(CorsLayer::very_permissive())
}

#[derive(Deserialize)]
struct ChatReq {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatResp {
    response: String,
    #[serde(rename = "type")]
    kind: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match self {
            ChatError::EmptyMessage => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            ChatError::BetaExpired { ref message } => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": self.to_string(), "message": message })),
            )
                .into_response(),
            ChatError::Internal(ref e) => {
                error!(error = ?e, "chat request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": self.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

/// `conversation_id` from the Cookie header(s).
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == SESSION_COOKIE && !v.is_empty()).then(|| v.to_string())
        })
        .next()
}

fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatReq>, JsonRejection>,
) -> Response {
    // an expired beta answers 403 whatever the body
    if let BetaStatus::Expired { expires_at } = state.chat.beta().status() {
        return ChatError::BetaExpired {
            message: BetaGate::expired_message(&expires_at),
        }
        .into_response();
    }
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(status = %rejection.status(), detail = %rejection.body_text(), "chat body rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": INVALID_REQUEST_ERROR })),
            )
                .into_response();
        }
    };

    let (session, fresh) = match session_from_headers(&headers) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let mut resp = match state.chat.handle(&session, &body.message).await {
        Ok(reply) => Json(ChatResp {
            response: reply.response,
            kind: reply.kind,
        })
        .into_response(),
        Err(e) => e.into_response(),
    };

    if fresh {
        if let Ok(v) = HeaderValue::from_str(&session_cookie(&session)) {
            resp.headers_mut().insert(header::SET_COOKIE, v);
        }
    }
    resp
}

async fn new_conversation(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_from_headers(&headers) {
        state.chat.sessions().clear(&id);
    }
    let mut resp = Json(json!({ "success": true })).into_response();
    if let Ok(v) = HeaderValue::from_str(&expired_session_cookie()) {
        resp.headers_mut().insert(header::SET_COOKIE, v);
    }
    resp
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": state.service_name }))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let service = html_escape::encode_text(&state.service_name).to_string();
    let page = match state.chat.beta().status() {
        BetaStatus::Expired { expires_at } => {
            expired_page(&service, &format_spanish_date(&expires_at))
        }
        BetaStatus::Active {
            minutes_remaining,
            expires_at,
        } => chat_page(
            &service,
            Some(&format!(
                "Versión beta: quedan {} minutos (expira el {}).",
                minutes_remaining,
                format_spanish_date(&expires_at)
            )),
        ),
        BetaStatus::Open => chat_page(&service, None),
    };
    Html(page)
}

fn expired_page(service: &str, date: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="es">
<head><meta charset="utf-8"><title>{service}: beta expirada</title>
<link rel="stylesheet" href="/static/style.css"></head>
<body class="expired">
<h1>La versión beta ha expirado</h1>
<p>Esta versión beta expiró el {}.</p>
<p>Contacta al administrador para obtener la versión completa.</p>
</body>
</html>"#,
        html_escape::encode_text(date)
    )
}

fn chat_page(service: &str, beta_notice: Option<&str>) -> String {
    let notice = beta_notice
        .map(|n| format!(r#"<div class="beta">{}</div>"#, html_escape::encode_text(n)))
        .unwrap_or_default();
    let now = Local::now().format("%H:%M");
    format!(
        r#"<!doctype html>
<html lang="es">
<head><meta charset="utf-8"><title>{service}</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<link rel="stylesheet" href="/static/style.css"></head>
<body>
<header><h1>{service}</h1>{notice}</header>
<main id="chat"><div class="msg bot"><span class="time">{now}</span>Hola, soy tu agente de planificación. ¿En qué te puedo ayudar?</div></main>
<form id="f"><input id="m" autocomplete="off" placeholder="Escribe tu pregunta..."><button>Enviar</button>
<button type="button" id="nueva">Nueva conversación</button></form>
<script>
const chat = document.getElementById('chat');
function add(cls, text) {{
  const d = document.createElement('div');
  d.className = 'msg ' + cls;
  d.textContent = text;
  chat.appendChild(d);
  chat.scrollTop = chat.scrollHeight;
}}
document.getElementById('f').addEventListener('submit', async (e) => {{
  e.preventDefault();
  const m = document.getElementById('m');
  const text = m.value.trim();
  if (!text) return;
  add('user', text);
  m.value = '';
  const r = await fetch('/chat', {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: JSON.stringify({{message: text}})}});
  const data = await r.json();
  add('bot', data.response || data.message || data.error);
}});
document.getElementById('nueva').addEventListener('click', async () => {{
  await fetch('/nueva-conversacion', {{method: 'POST'}});
  chat.innerHTML = '';
}});
</script>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_parsed_among_others() {
        let mut h = HeaderMap::new();
        h.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; conversation_id=abc-123; other=1"),
        );
        assert_eq!(session_from_headers(&h).as_deref(), Some("abc-123"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("conversation_id="));
        assert!(session_from_headers(&empty).is_none());
    }

    #[test]
    fn pages_escape_service_name_and_show_beta() {
        let page = chat_page("A &amp; B", Some("quedan 5 minutos"));
        assert!(page.contains("A &amp; B"));
        assert!(page.contains(r#"<div class="beta">quedan 5 minutos</div>"#));
        assert!(expired_page("x", "1 de marzo de 2026 a las 08:00").contains("expiró el 1 de marzo"));
    }
}
