//! HTTP adapter mapping for domain errors.
//!
//! Keeps the domain error type HTTP-agnostic while giving Actix handlers
//! consistent JSON error bodies and status codes. Extractor failures
//! (malformed JSON, bad path segments, bad query strings) are routed
//! through the same envelope.

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use tracing::{debug, error};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

/// Largest accepted JSON body.
pub const JSON_BODY_LIMIT: usize = 256 * 1024;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        error!(message = error.message(), trace_id = ?error.trace_id(), "internal error");
        let mut redacted = Error::internal("Internal server error");
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }

        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

fn malformed(code: &str, message: String) -> Error {
    debug!(%code, %message, "request rejected by extractor");
    Error::invalid_request(message).with_details(json!({ "code": code }))
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let error = match &err {
        JsonPayloadError::ContentType => Error::invalid_request(
            "request body must be application/json",
        )
        .with_details(json!({ "code": "unsupported_content_type" })),
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            malformed("payload_too_large", err.to_string())
        }
        _ => malformed("malformed_json", err.to_string()),
    };
    error.into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    malformed("invalid_path", err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    malformed("invalid_query", err.to_string()).into()
}

/// Extractor configs that turn payload failures into [`Error`] envelopes.
pub fn request_error_configs() -> (web::JsonConfig, web::PathConfig, web::QueryConfig) {
    (
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(json_error),
        web::PathConfig::default().error_handler(path_error),
        web::QueryConfig::default().error_handler(query_error),
    )
}
