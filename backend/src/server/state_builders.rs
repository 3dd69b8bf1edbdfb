//! Builders selecting adapters for the HTTP state.
//!
//! Each builder picks the real adapter when its settings are present and
//! falls back to an in-process implementation otherwise.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, bail};
use mockable::DefaultClock;
use tracing::{info, warn};
use url::Url;

use lingo::domain::ports::{
    FixtureTextToSpeechSource, IdentityProvider, Repositories, TextToSpeechSource,
};
use lingo::inbound::http::state::HttpState;
use lingo::outbound::documents::{DocumentStore, InMemoryDocumentStore, document_repositories};
use lingo::outbound::identity::{FixtureIdentityProvider, JwtIdentityProvider, JwtKey};
use lingo::outbound::persistence::{DbPool, DieselDocumentStore, PoolConfig, run_migrations};
use lingo::outbound::tts::HttpTextToSpeechSource;

use super::AppSettings;

/// Document store behind every repository.
///
/// Connects to PostgreSQL (running migrations first when enabled) when a
/// database URL is configured; otherwise keeps documents in memory.
pub(super) async fn build_repositories(settings: &AppSettings) -> Result<Repositories> {
    let store: Arc<dyn DocumentStore> = match settings.database_url() {
        Some(url) => {
            if settings.run_migrations {
                run_migrations(url)
                    .await
                    .wrap_err("failed to apply database migrations")?;
            }
            let pool = DbPool::new(
                PoolConfig::new(url).with_max_size(settings.db_max_connections()),
            )
            .await
            .wrap_err("failed to build database pool")?;
            info!(max_connections = settings.db_max_connections(), "using PostgreSQL store");
            Arc::new(DieselDocumentStore::new(pool))
        }
        None => {
            warn!("no database URL configured; documents are kept in memory");
            Arc::new(InMemoryDocumentStore::new())
        }
    };
    Ok(document_repositories(store))
}

/// Select the key material for bearer token verification.
///
/// A public key file wins over a shared secret. `None` means no key is
/// configured.
fn jwt_key(settings: &AppSettings) -> Result<Option<JwtKey>> {
    if let Some(path) = &settings.jwt_public_key_path {
        let pem = std::fs::read(path)
            .wrap_err_with(|| format!("failed to read JWT public key at {}", path.display()))?;
        return Ok(Some(JwtKey::RsaPublicKeyPem(pem)));
    }
    Ok(settings
        .jwt_secret
        .as_ref()
        .filter(|secret| !secret.trim().is_empty())
        .map(|secret| JwtKey::Secret(secret.clone())))
}

pub(super) fn build_identity(settings: &AppSettings) -> Result<Arc<dyn IdentityProvider>> {
    match jwt_key(settings)? {
        Some(key) => {
            let mut provider =
                JwtIdentityProvider::new(&key).wrap_err("invalid JWT verification key")?;
            if let Some(issuer) = settings.jwt_issuer.as_deref() {
                provider = provider.with_issuer(issuer);
            }
            if let Some(audience) = settings.jwt_audience.as_deref() {
                provider = provider.with_audience(audience);
            }
            Ok(Arc::new(provider))
        }
        None if settings.allow_fixture_tokens => {
            warn!("no JWT key configured; accepting fixture tokens");
            Ok(Arc::new(FixtureIdentityProvider))
        }
        None => bail!(
            "no JWT key configured; set LINGO_JWT_SECRET or LINGO_JWT_PUBLIC_KEY_PATH, \
             or LINGO_ALLOW_FIXTURE_TOKENS for development"
        ),
    }
}

pub(super) fn build_speech_source(settings: &AppSettings) -> Result<Arc<dyn TextToSpeechSource>> {
    let Some(endpoint) = settings.tts_endpoint() else {
        info!("text-to-speech not configured");
        return Ok(Arc::new(FixtureTextToSpeechSource));
    };
    let endpoint = Url::parse(endpoint).wrap_err("invalid text-to-speech endpoint")?;
    let source = HttpTextToSpeechSource::new(
        endpoint,
        settings.tts_api_key.clone(),
        settings.tts_timeout(),
    )
    .wrap_err("failed to build text-to-speech client")?;
    Ok(Arc::new(source))
}

/// Build the shared HTTP state from the configured adapters.
pub(crate) async fn build_http_state(settings: &AppSettings) -> Result<web::Data<HttpState>> {
    let repositories = build_repositories(settings).await?;
    let identity = build_identity(settings)?;
    let speech = build_speech_source(settings)?;
    Ok(web::Data::new(HttpState::from_repositories(
        repositories,
        identity,
        speech,
        Arc::new(DefaultClock),
    )))
}
