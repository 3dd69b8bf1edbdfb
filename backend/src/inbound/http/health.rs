//! Liveness and readiness probes for orchestrators and load balancers.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};

/// Readiness and liveness flags shared with the probe handlers.
///
/// The server starts live but not ready; `create_server` marks it ready once
/// the listener is bound and the document store is reachable.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness probes so the orchestrator drains the instance.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };
        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Readiness probe: 200 once the server accepts traffic, 503 before.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server is not ready")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe: 200 while alive, 503 once draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;

    async fn probe(state: HealthState, uri: &str) -> (StatusCode, Option<String>) {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(ready)
                .service(live),
        )
        .await;
        let response =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await;
        let cache = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        (response.status(), cache)
    }

    #[rstest]
    #[case(false, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(true, StatusCode::OK)]
    #[actix_web::test]
    async fn readiness_follows_the_flag(#[case] mark_ready: bool, #[case] expected: StatusCode) {
        let state = HealthState::new();
        if mark_ready {
            state.mark_ready();
        }
        let (status, cache) = probe(state, "/health/ready").await;
        assert_eq!(status, expected);
        assert_eq!(cache.as_deref(), Some("no-store"));
    }

    #[rstest]
    #[actix_web::test]
    async fn liveness_fails_once_draining() {
        let (status, _) = probe(HealthState::new(), "/health/live").await;
        assert_eq!(status, StatusCode::OK);

        let draining = HealthState::new();
        draining.mark_unhealthy();
        let (status, cache) = probe(draining, "/health/live").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(cache.as_deref(), Some("no-store"));
    }
}
