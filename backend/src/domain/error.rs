//! Domain-level error type.
//!
//! Errors are transport agnostic. The HTTP adapter maps [`ErrorCode`] to a
//! status code and serialises the payload; services only pick a category and
//! a message, optionally attaching structured `details`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::trace_id::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The request conflicts with the current state of a resource.
    Conflict,
    /// A dependency is temporarily unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the service.
    InternalError,
}

/// Validation errors for [`Error::try_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorValidationError {
    EmptyMessage,
}

impl fmt::Display for ErrorValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "error message must not be empty"),
        }
    }
}

impl std::error::Error for ErrorValidationError {}

/// Error payload shared by every inbound adapter.
///
/// ## Invariants
/// - `message` is non-empty once trimmed.
/// - `trace_id` is captured from the active [`TraceId`] scope at construction.
///
/// # Examples
/// ```
/// use lingo::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("lesson not found");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    #[schema(example = "invalid_request")]
    code: ErrorCode,
    #[schema(example = "Something went wrong")]
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Fallible constructor that validates the message.
    pub fn try_new(
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        })
    }

    /// Construct an error; blank messages fall back to the code name.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(error) => error,
            Err(ErrorValidationError::EmptyMessage) => Self {
                code,
                message: format!("{code:?}"),
                trace_id: TraceId::current().map(|id| id.to_string()),
                details: None,
            },
        }
    }

    /// Stable error category.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Correlation identifier, when one was in scope.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Structured details for clients.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach a trace identifier.
    #[must_use]
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// [`ErrorCode::InvalidRequest`] error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// [`ErrorCode::InvalidRequest`] error naming the offending field.
    ///
    /// # Examples
    /// ```
    /// use lingo::domain::Error;
    ///
    /// let err = Error::invalid_field("order", "duplicate_order", "order already used");
    /// assert_eq!(err.details().and_then(|d| d.get("field")).and_then(|f| f.as_str()), Some("order"));
    /// ```
    pub fn invalid_field(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self::invalid_request(message).with_details(json!({ "field": field, "code": code }))
    }

    /// [`ErrorCode::Unauthorized`] error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// [`ErrorCode::Forbidden`] error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// [`ErrorCode::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// [`ErrorCode::Conflict`] error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// [`ErrorCode::Conflict`] error with a machine-readable reason.
    pub fn conflict_with_code(code: &str, message: impl Into<String>) -> Self {
        Self::conflict(message).with_details(json!({ "code": code }))
    }

    /// [`ErrorCode::ServiceUnavailable`] error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// [`ErrorCode::InternalError`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TRACE: &str = "00000000-0000-0000-0000-000000000000";

    #[rstest]
    fn try_new_rejects_blank_messages() {
        let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
        assert_eq!(result, Err(ErrorValidationError::EmptyMessage));
    }

    #[rstest]
    fn new_falls_back_to_code_name_for_blank_messages() {
        let error = Error::new(ErrorCode::Conflict, "");
        assert_eq!(error.message(), "Conflict");
    }

    #[rstest]
    fn trace_id_absent_out_of_scope() {
        assert!(Error::internal("boom").trace_id().is_none());
    }

    #[tokio::test]
    async fn captures_trace_id_in_scope() {
        let trace_id: TraceId = TRACE.parse().expect("valid uuid");
        let error = TraceId::scope(trace_id, async { Error::not_found("gone") }).await;
        assert_eq!(error.trace_id(), Some(TRACE));
    }

    #[rstest]
    fn serialises_camel_case_and_skips_empty_fields() {
        let error = Error::conflict_with_code("duplicate_order", "order already used");
        let value = serde_json::to_value(&error).expect("serialise");
        assert_eq!(value["code"], "conflict");
        assert_eq!(value["details"]["code"], "duplicate_order");
        assert!(value.get("traceId").is_none());
    }
}
