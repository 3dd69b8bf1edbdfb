//! Backend entry-point: loads settings, selects adapters and serves the API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use lingo::inbound::http::health::HealthState;

use server::{AppSettings, ServerConfig, build_http_state, create_server};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .wrap_err("failed to load configuration")?;
    let bind_addr = settings.bind_addr().wrap_err("invalid bind address")?;

    let health_state = web::Data::new(HealthState::new());
    let http_state = build_http_state(&settings).await?;

    let config = ServerConfig::new(bind_addr);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(server::build_prometheus()?));

    let server = create_server(health_state, http_state, config)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    server.await.wrap_err("server terminated")
}
