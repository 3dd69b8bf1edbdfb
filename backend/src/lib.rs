//! Lingo backend library.
//!
//! Layout follows ports and adapters: [`domain`] holds entities, rules and
//! services, [`inbound`] the HTTP adapter, [`outbound`] storage, identity and
//! speech adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
