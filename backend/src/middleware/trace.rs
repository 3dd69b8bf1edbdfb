//! Tracing middleware attaching a request-scoped trace identifier.
//!
//! Each request runs inside a fresh [`TraceId`] scope so log lines and error
//! payloads produced while handling it share one correlation id. The id is
//! echoed in the `trace-id` response header.

use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{Instrument, error, info_span};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware factory.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use lingo::Trace;
///
/// let app = App::new().wrap(Trace);
/// ```
#[derive(Clone)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

/// Service wrapper produced by [`Trace`].
pub struct TraceMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = TraceId::generate();
        let span = info_span!(
            "request",
            trace_id = %trace_id,
            method = %req.method(),
            path = %req.path()
        );
        let header_value = trace_id.to_string();
        let fut = TraceId::scope(trace_id, self.service.call(req));
        Box::pin(
            async move {
                let mut res = fut.await?;
                match HeaderValue::from_str(&header_value) {
                    Ok(value) => {
                        res.response_mut()
                            .headers_mut()
                            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                    }
                    Err(error) => {
                        error!(%error, "failed to encode trace identifier header");
                    }
                }
                Ok(res)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, test as actix_test, web};

    use super::*;
    use crate::domain::Error as ApiError;
    use crate::inbound::http::ApiResult;

    async fn call_traced<F, Fut, Res>(
        handler: F,
    ) -> (ServiceResponse<actix_web::body::BoxBody>, String)
    where
        F: Fn() -> Fut + Clone + 'static,
        Fut: std::future::Future<Output = Res> + 'static,
        Res: actix_web::Responder + 'static,
    {
        let app =
            actix_test::init_service(App::new().wrap(Trace).route("/", web::get().to(handler))).await;
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
        let trace_id = res
            .headers()
            .get(TRACE_ID_HEADER)
            .expect("trace id header")
            .to_str()
            .expect("header is ascii")
            .to_owned();
        (res, trace_id)
    }

    #[actix_web::test]
    async fn handlers_see_the_header_trace_id() {
        let (res, trace_id) = call_traced(|| async move {
            let id = TraceId::current().expect("trace id in scope");
            HttpResponse::Ok().body(id.to_string())
        })
        .await;
        let body = actix_test::read_body(res).await;
        assert_eq!(std::str::from_utf8(&body).expect("utf8 body"), trace_id);
    }

    #[actix_web::test]
    async fn error_payloads_carry_the_trace_id() {
        let (res, trace_id) = call_traced(|| async move {
            ApiResult::<HttpResponse>::Err(ApiError::internal("boom"))
        })
        .await;
        let body: ApiError = actix_test::read_body_json(res).await;
        assert_eq!(body.trace_id(), Some(trace_id.as_str()));
    }

    #[actix_web::test]
    async fn each_request_gets_its_own_id() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Trace)
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let first = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
        let second = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
        assert_ne!(
            first.headers().get(TRACE_ID_HEADER),
            second.headers().get(TRACE_ID_HEADER)
        );
    }
}
