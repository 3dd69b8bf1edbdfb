//! Optional Prometheus metrics: the `/metrics` endpoint plus a middleware
//! wrapper that stays a pass-through when metrics are off.

use actix_service::{
    Service, ServiceExt as _, Transform,
    boxed::{self, BoxService},
};
use actix_web::body::BoxBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Compat;
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use color_eyre::eyre::{self, eyre};
use futures_util::future::LocalBoxFuture;
use std::sync::Arc;

/// Request metrics under the `lingo` namespace, served at `/metrics`.
pub(crate) fn build_prometheus() -> eyre::Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("lingo")
        .endpoint("/metrics")
        .build()
        .map_err(|err| eyre!("failed to configure Prometheus metrics: {err}"))
}

#[derive(Clone)]
pub(crate) enum MetricsLayer {
    Enabled(Arc<PrometheusMetrics>),
    Disabled,
}

impl MetricsLayer {
    #[must_use]
    pub(crate) fn from_option(metrics: Option<PrometheusMetrics>) -> Self {
        metrics.map_or(Self::Disabled, |metrics| Self::Enabled(Arc::new(metrics)))
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = BoxService<ServiceRequest, ServiceResponse<BoxBody>, actix_web::Error>;
    type Future = LocalBoxFuture<'static, Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        match self.clone() {
            MetricsLayer::Enabled(metrics) => {
                let fut = Compat::new((*metrics).clone()).new_transform(service);
                Box::pin(async move { Ok(boxed::service(fut.await?)) })
            }
            MetricsLayer::Disabled => Box::pin(async move {
                let svc = service.map(|res: ServiceResponse<B>| res.map_into_boxed_body());
                Ok(boxed::service(svc))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test as actix_test, web};
    use rstest::rstest;

    #[rstest]
    #[actix_web::test]
    async fn metrics_endpoint_is_served_when_enabled() {
        let layer = MetricsLayer::from_option(Some(build_prometheus().expect("prometheus")));
        let app = actix_test::init_service(
            App::new()
                .wrap(layer)
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
        let res =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri("/metrics").to_request()).await;
        assert!(res.status().is_success());
        let body = actix_test::read_body(res).await;
        assert!(std::str::from_utf8(&body).expect("utf8").contains("lingo_"));
    }

    #[rstest]
    #[actix_web::test]
    async fn disabled_layer_passes_requests_through() {
        let app = actix_test::init_service(
            App::new()
                .wrap(MetricsLayer::from_option(None))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
        assert!(res.status().is_success());
    }
}
