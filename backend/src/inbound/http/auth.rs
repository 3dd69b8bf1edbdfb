//! Bearer token authentication for HTTP handlers.
//!
//! [`AuthContext`] verifies the `Authorization: Bearer` header through the
//! identity provider and resolves the platform user behind it, so handlers
//! receive a ready [`User`].

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::debug;

use crate::domain::{Error, User};

use super::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<String, Error> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("missing bearer token"))?;
    let value = value
        .to_str()
        .map_err(|_| Error::unauthorized("malformed authorization header"))?;
    let token = value
        .split_at_checked(BEARER_PREFIX.len())
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_PREFIX))
        .map(|(_, rest)| rest.trim())
        .ok_or_else(|| Error::unauthorized("authorization scheme must be Bearer"))?;
    if token.is_empty() {
        return Err(Error::unauthorized("missing bearer token"));
    }
    Ok(token.to_owned())
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthContext {
    user: User,
}

impl AuthContext {
    pub fn user(&self) -> &User {
        &self.user
    }

    /// The caller, or `403 Forbidden` unless they are an administrator.
    pub fn require_admin(&self) -> Result<&User, Error> {
        if self.user.is_admin() {
            Ok(&self.user)
        } else {
            debug!(user_id = %self.user.id, "admin route refused");
            Err(Error::forbidden("administrator role required"))
        }
    }
}

impl FromRequest for AuthContext {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = bearer_token(req.headers());
        Box::pin(async move {
            let state = state.ok_or_else(|| Error::internal("HTTP state is not configured"))?;
            let identity = state.identity.verify(&token?).await?;
            let user = state.accounts.resolve(&identity).await?;
            Ok(Self { user })
        })
    }
}
