//! Signed bearer token verification with `jsonwebtoken`.
//!
//! Tokens must carry `sub` and an unexpired `exp`. Issuer and audience are
//! checked only when configured. The role is read from
//! `public_metadata.role`, then `role`, and defaults to learner.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;

use crate::domain::auth::Identity;
use crate::domain::ports::{IdentityProvider, IdentityProviderError};
use crate::domain::user::Role;

/// Verification key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtKey {
    /// Shared secret for HS256.
    Secret(String),
    /// PEM encoded RSA public key for RS256.
    RsaPublicKeyPem(Vec<u8>),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PublicMetadata {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    public_metadata: Option<PublicMetadata>,
}

impl Claims {
    fn role(&self) -> Role {
        let claimed = self
            .public_metadata
            .as_ref()
            .and_then(|metadata| metadata.role.as_deref())
            .or(self.role.as_deref());
        match claimed.map(str::parse::<Role>) {
            Some(Ok(role)) => role,
            Some(Err(err)) => {
                debug!(subject = %self.sub, %err, "ignoring unrecognised role claim");
                Role::Learner
            }
            None => Role::Learner,
        }
    }
}

/// [`IdentityProvider`] that validates JWTs locally.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    /// Build a verifier for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when an RSA key is not valid PEM.
    pub fn new(key: &JwtKey) -> Result<Self, jsonwebtoken::errors::Error> {
        let (key, algorithm) = match key {
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            JwtKey::RsaPublicKeyPem(pem) => (DecodingKey::from_rsa_pem(pem)?, Algorithm::RS256),
        };
        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_aud = false;
        Ok(Self { key, validation })
    }

    /// Require the `iss` claim to equal `issuer`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Require the `aud` claim to contain `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityProviderError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|err| {
            debug!(error = %err, "bearer token rejected");
            IdentityProviderError::invalid_token(err.to_string())
        })?;
        let claims = data.claims;
        let role = claims.role();
        Ok(Identity {
            subject: claims.sub,
            email: claims.email,
            display_name: claims.name,
            role,
        })
    }
}
