//! Agente de planificación: binary entrypoint.
//! Loads `.env`, initialises tracing, then serves the router built by `app()`.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agente_planificacion=info,warn"));

    // shuttle may have installed a subscriber already
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let router = agente_planificacion::app()
        .await
        .map_err(shuttle_runtime::Error::from)?;

    Ok(router.into())
}
