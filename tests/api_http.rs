// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health, GET /
// - POST /chat (success, 400, 403, 500, session cookie)
// - POST /nueva-conversacion
// - GET /static/* no-cache headers
// - GET /metrics

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Local};
use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use agente_planificacion::api::{self, AppState};
use agente_planificacion::beta::BetaGate;
use agente_planificacion::chat::ChatService;
use agente_planificacion::config::ai::AiConfig;
use agente_planificacion::config::AppConfig;
use agente_planificacion::generator::{DynGenerator, MockGenerator};
use agente_planificacion::session::SessionStore as _;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn seed(dir: &Path) {
    fs::write(
        dir.join("glosario.txt"),
        "**Zonificación**:\nInstrumento de planificación que clasifica los terrenos.\n",
    )
    .unwrap();
    fs::create_dir_all(dir.join("static")).unwrap();
    fs::write(dir.join("static/style.css"), "body { margin: 0; }").unwrap();
}

fn config(dir: &Path) -> AppConfig {
    let mut cfg = AppConfig::with_data_dir(dir);
    cfg.static_dir = dir.join("static");
    cfg.service_name = "Agente de prueba".to_string();
    cfg
}

fn build(dir: &Path, beta: Option<BetaGate>) -> (Router, Arc<ChatService>) {
    let cfg = config(dir);
    let gen: DynGenerator = Arc::new(MockGenerator::default());
    let mut chat = ChatService::from_config(&cfg, &AiConfig::default(), gen, Local::now())
        .expect("chat service");
    if let Some(b) = beta {
        chat = chat.with_beta(b);
    }
    let chat = Arc::new(chat);
    let router = api::router(AppState {
        chat: chat.clone(),
        service_name: cfg.service_name.clone(),
        static_dir: cfg.static_dir.clone(),
    });
    (router, chat)
}

fn chat_request(body: Json, cookie: Option<&str>) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    req.body(Body::from(body.to_string())).expect("build POST /chat")
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("valid json")
}

#[tokio::test]
async fn health_reports_service_name() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let (app, _) = build(tmp.path(), None);

    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(v["status"], "ok");
    assert_eq!(v["service"], "Agente de prueba");
}

#[tokio::test]
async fn chat_returns_response_and_type_and_sets_cookie() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let (app, _) = build(tmp.path(), None);

    let resp = app
        .oneshot(chat_request(json!({ "message": "¿Qué es zonificación?" }), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("new session cookie")
        .to_string();
    assert!(cookie.starts_with("conversation_id="), "{cookie}");

    let v = json_body(resp).await;
    assert_eq!(v["type"], "glosario");
    assert!(v["response"].as_str().unwrap().contains("Zonificación"));
}

#[tokio::test]
async fn known_session_cookie_is_reused() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let (app, chat) = build(tmp.path(), None);

    for msg in ["hola", "cuéntame un chiste"] {
        let resp = app
            .clone()
            .oneshot(chat_request(json!({ "message": msg }), Some("conversation_id=fixed-1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(resp).await["type"], "general");
    }

    let conv = chat.sessions().get_or_create("fixed-1");
    assert_eq!(conv.lock().await.len(), 5);
}

#[tokio::test]
async fn empty_message_returns_400() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let (app, _) = build(tmp.path(), None);

    for body in [json!({ "message": "" }), json!({})] {
        let resp = app.clone().oneshot(chat_request(body, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "Mensaje vacío");
    }
}

#[tokio::test]
async fn expired_beta_returns_403_and_expired_page() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let past = Local::now() - Duration::hours(2);
    let (app, _) = build(tmp.path(), Some(BetaGate::new(Some(past))));

    let resp = app
        .clone()
        .oneshot(chat_request(json!({ "message": "¿Qué es zonificación?" }), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "La versión beta ha expirado");
    assert!(v["message"].as_str().unwrap().contains("expiró"));

    let page = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let html = body::to_bytes(page.into_body(), BODY_LIMIT).await.unwrap();
    let html = String::from_utf8(html.to_vec()).unwrap();
    assert!(html.contains("La versión beta ha expirado"));
}

#[tokio::test]
async fn active_beta_page_shows_remaining_time() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let later = Local::now() + Duration::hours(3);
    let (app, _) = build(tmp.path(), Some(BetaGate::new(Some(later))));

    let page = app
        .oneshot(Request::get("/v2").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let html = body::to_bytes(page.into_body(), BODY_LIMIT).await.unwrap();
    let html = String::from_utf8(html.to_vec()).unwrap();
    assert!(html.contains("Agente de prueba"));
    assert!(html.contains("Versión beta: quedan"));
}

#[tokio::test]
async fn new_conversation_clears_session_and_expires_cookie() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let (app, chat) = build(tmp.path(), None);

    app.clone()
        .oneshot(chat_request(json!({ "message": "hola" }), Some("conversation_id=c-9")))
        .await
        .unwrap();
    assert_eq!(chat.sessions().len(), 1);

    let req = Request::post("/nueva-conversacion")
        .header(header::COOKIE, "conversation_id=c-9")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(json_body(resp).await, json!({ "success": true }));
    assert!(chat.sessions().is_empty());
}

#[tokio::test]
async fn static_assets_are_not_cached() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let (app, _) = build(tmp.path(), None);

    let resp = app
        .oneshot(Request::get("/static/style.css").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let h = resp.headers();
    assert_eq!(h[header::CACHE_CONTROL], "no-cache, no-store, must-revalidate");
    assert_eq!(h[header::PRAGMA], "no-cache");
    assert_eq!(h[header::EXPIRES], "0");
}

#[tokio::test]
async fn generator_failure_on_general_path_returns_500() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    // Disabled AI config and no mock override → DisabledGenerator
    let app = agente_planificacion::app_with(config(tmp.path()), &AiConfig::default())
        .expect("app_with builds");

    let resp = app
        .clone()
        .oneshot(chat_request(json!({ "message": "hola" }), Some("conversation_id=e-1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["error"], "Error interno del servidor");

    // glossary answers need no generator and are counted
    let ok = app
        .clone()
        .oneshot(chat_request(json!({ "message": "¿Qué es zonificación?" }), None))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let metrics = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let text = body::to_bytes(metrics.into_body(), BODY_LIMIT).await.unwrap();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("chat_replies_total"), "metrics:\n{text}");
}

fn raw_chat_request(content_type: &str, body: &'static str) -> Request<Body> {
    Request::post("/chat")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("build raw POST /chat")
}

fn malformed_bodies() -> Vec<Request<Body>> {
    vec![
        raw_chat_request("application/json", "not json"),
        raw_chat_request("application/json", r#"{"message":5}"#),
        raw_chat_request("text/plain", "hola"),
    ]
}

#[tokio::test]
async fn malformed_body_returns_json_error_without_parser_detail() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let (app, _) = build(tmp.path(), None);

    for req in malformed_bodies() {
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({ "error": api::INVALID_REQUEST_ERROR }));
    }
}

#[tokio::test]
async fn expired_beta_wins_over_malformed_body() {
    let tmp = tempfile::tempdir().unwrap();
    seed(tmp.path());
    let past = Local::now() - Duration::minutes(5);
    let (app, _) = build(tmp.path(), Some(BetaGate::new(Some(past))));

    for req in malformed_bodies() {
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["error"], "La versión beta ha expirado");
    }
}
