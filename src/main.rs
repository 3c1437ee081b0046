use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use medbill_core::config::{
    CoreConfig, data_dir_from_env_value, gateway_timeout_from_env_value,
    gemini_settings_from_env_values, render_timeout_from_env_value,
};
use medbill_core::suggestions::{GenerativeModel, create_model};

/// Resolve the listen address from `MEDBILL_REST_ADDR`, with `PORT` overriding the port
/// the way hosting platforms expect.
fn rest_addr(addr: Option<String>, port: Option<String>) -> anyhow::Result<SocketAddr> {
    let mut addr: SocketAddr = addr
        .unwrap_or_else(|| "0.0.0.0:3000".into())
        .parse()?;
    if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
        addr.set_port(port.trim().parse()?);
    }
    Ok(addr)
}

/// Main entry point for the MedBill service
///
/// Serves the REST API (and its Swagger UI) on one listener.
///
/// # Environment Variables
/// - `MEDBILL_REST_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `PORT`: overrides the port of the listen address
/// - `MEDBILL_DATA_DIR`: directory for uploads and bills (default: "data", or "/tmp/medbill"
///   when `VERCEL` is set)
/// - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_API_BASE`: model connection; without a key
///   every suggestion uses the keyword rules
/// - `MEDBILL_GATEWAY_TIMEOUT_SECS`, `MEDBILL_RENDER_TIMEOUT_SECS`: per-call time limits
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medbill_run=info".parse()?)
                .add_directive("medbill_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = |name: &str| std::env::var(name).ok();

    let serverless = env("VERCEL").is_some();
    let cfg = Arc::new(CoreConfig::new(
        data_dir_from_env_value(env("MEDBILL_DATA_DIR"), serverless),
        gemini_settings_from_env_values(
            env("GEMINI_API_KEY"),
            env("GEMINI_MODEL"),
            env("GEMINI_API_BASE"),
        ),
        gateway_timeout_from_env_value(env("MEDBILL_GATEWAY_TIMEOUT_SECS"))?,
        render_timeout_from_env_value(env("MEDBILL_RENDER_TIMEOUT_SECS"))?,
    )?);
    let addr = rest_addr(env("MEDBILL_REST_ADDR"), env("PORT"))?;

    let model = create_model(cfg.gemini(), cfg.gateway_timeout())?;
    tracing::info!("++ Model: {}", model.name());
    tracing::info!("++ Data directory: {}", cfg.data_dir().display());

    let environment = if serverless { "serverless" } else { "local" };
    let state = AppState::new(cfg, model, environment)?;

    tracing::info!("++ Starting MedBill REST on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
