//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod state_builders;

pub use config::{AppSettings, ServerConfig};
#[cfg(feature = "metrics")]
pub(crate) use metrics::build_prometheus;
pub(crate) use state_builders::build_http_state;

#[cfg(feature = "metrics")]
use metrics::MetricsLayer;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

use lingo::Trace;
#[cfg(debug_assertions)]
use lingo::doc::ApiDoc;
use lingo::inbound::http::configure_api;
use lingo::inbound::http::error::request_error_configs;
use lingo::inbound::http::health::{HealthState, live, ready};
use lingo::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;
    let (json, path, query) = request_error_configs();

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json)
        .app_data(path)
        .app_data(query)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server for the prepared state.
///
/// Readiness flips to ready once the socket is bound.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;

    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from_option(prometheus);

    let server = HttpServer::new(move || {
        let app = build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        });

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "listening");
    health_state.mark_ready();
    Ok(server)
}
