use shuttle_axum::axum::{routing::get, Router};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process; later calls reuse it.
    pub fn init() -> anyhow::Result<Self> {
        if let Some(h) = HANDLE.get() {
            return Ok(Self { handle: h.clone() });
        }
        let handle = match PrometheusBuilder::new().install_recorder() {
            Ok(h) => HANDLE.get_or_init(|| h).clone(),
            // another thread won the race
            Err(e) => HANDLE
                .get()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("prometheus: install recorder: {e}"))?,
        };
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One chat reply of the given type (`glosario`, `legal-permisos`, ...).
pub fn record_reply(kind: &str) {
    counter!("chat_replies_total", "type" => kind.to_string()).increment(1);
}

/// A legal source dropped because generation failed or came back too short.
pub fn record_generator_skip() {
    counter!("generator_skips_total").increment(1);
}
