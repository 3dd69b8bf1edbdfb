//! Port for verifying bearer tokens.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::Error;
use crate::domain::auth::Identity;

define_port_error! {
    /// Errors raised while verifying a token.
    pub enum IdentityProviderError {
        /// Token is malformed, expired or signed with the wrong key.
        InvalidToken { message: String } => "invalid token: {message}",
        /// The provider could not be consulted.
        Unavailable { message: String } => "identity provider unavailable: {message}",
    }
}

impl From<IdentityProviderError> for Error {
    fn from(error: IdentityProviderError) -> Self {
        match error {
            IdentityProviderError::InvalidToken { message } => {
                tracing::debug!(%message, "bearer token rejected");
                Self::unauthorized("invalid or expired token")
            }
            IdentityProviderError::Unavailable { message } => {
                tracing::error!(%message, "identity provider unavailable");
                Self::service_unavailable("identity provider is unavailable")
            }
        }
    }
}

/// Verifies bearer tokens and extracts the caller identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityProviderError>;
}
