//! Static bearer tokens for tests and local development.

use async_trait::async_trait;

use crate::domain::auth::Identity;
use crate::domain::ports::{IdentityProvider, IdentityProviderError};
use crate::domain::user::Role;

/// Token accepted as the fixture administrator.
pub const ADMIN_TOKEN: &str = "admin-token";
/// Token accepted as the fixture learner.
pub const LEARNER_TOKEN: &str = "learner-token";

/// Accepts [`ADMIN_TOKEN`] and [`LEARNER_TOKEN`] and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityProvider;

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityProviderError> {
        let (subject, name, role) = match token {
            ADMIN_TOKEN => ("fixture-admin", "Admin", Role::Admin),
            LEARNER_TOKEN => ("fixture-learner", "Learner", Role::Learner),
            _ => return Err(IdentityProviderError::invalid_token("unknown fixture token")),
        };
        Ok(Identity {
            subject: subject.to_owned(),
            email: Some(format!("{subject}@lingo.invalid")),
            display_name: Some(name.to_owned()),
            role,
        })
    }
}
