//! Runtime settings loaded via OrthoConfig and the server configuration
//! derived from them.
//!
//! Every setting can come from a `--flag`, a `LINGO_*` environment variable
//! or a configuration file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_TTS_TIMEOUT_SECS: u64 = 10;

/// Settings for the `lingo` server binary.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LINGO")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub db_max_connections: Option<u32>,
    /// HS256 shared secret for bearer tokens.
    pub jwt_secret: Option<String>,
    /// PEM file with an RS256 public key; takes precedence over the secret.
    pub jwt_public_key_path: Option<PathBuf>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    /// Accept the fixed development tokens when no JWT key is configured.
    #[ortho_config(default = false)]
    pub allow_fixture_tokens: bool,
    pub tts_endpoint: Option<String>,
    pub tts_api_key: Option<String>,
    pub tts_timeout_secs: Option<u64>,
    /// Apply pending migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

impl AppSettings {
    /// Configured bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the address is malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr
            .as_deref()
            .filter(|addr| !addr.trim().is_empty())
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    pub fn tts_endpoint(&self) -> Option<&str> {
        self.tts_endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
    }

    pub fn tts_timeout(&self) -> Duration {
        Duration::from_secs(
            self.tts_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TTS_TIMEOUT_SECS),
        )
    }
}

/// Values needed to bind and run the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}

#[cfg(test)]
mod tests {
    //! Settings parsing from the environment.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 12] = [
        "LINGO_BIND_ADDR",
        "LINGO_DATABASE_URL",
        "LINGO_DB_MAX_CONNECTIONS",
        "LINGO_JWT_SECRET",
        "LINGO_JWT_PUBLIC_KEY_PATH",
        "LINGO_JWT_ISSUER",
        "LINGO_JWT_AUDIENCE",
        "LINGO_ALLOW_FIXTURE_TOKENS",
        "LINGO_TTS_ENDPOINT",
        "LINGO_TTS_API_KEY",
        "LINGO_TTS_TIMEOUT_SECS",
        "LINGO_RUN_MIGRATIONS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("lingo")]).expect("config should load")
    }

    fn cleared_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(cleared_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default address"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("literal")
        );
        assert!(settings.database_url().is_none());
        assert_eq!(settings.db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);
        assert!(!settings.allow_fixture_tokens);
        assert!(settings.run_migrations);
        assert!(settings.tts_endpoint().is_none());
        assert_eq!(settings.tts_timeout(), Duration::from_secs(10));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared_with(&[
            ("LINGO_BIND_ADDR", "127.0.0.1:9000"),
            ("LINGO_DATABASE_URL", "postgres://lingo@localhost/lingo"),
            ("LINGO_DB_MAX_CONNECTIONS", "4"),
            ("LINGO_JWT_ISSUER", "https://issuer.example"),
            ("LINGO_ALLOW_FIXTURE_TOKENS", "true"),
            ("LINGO_TTS_ENDPOINT", "https://tts.example/v1/speak"),
            ("LINGO_TTS_TIMEOUT_SECS", "3"),
            ("LINGO_RUN_MIGRATIONS", "false"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("address"),
            "127.0.0.1:9000".parse::<SocketAddr>().expect("literal")
        );
        assert_eq!(
            settings.database_url(),
            Some("postgres://lingo@localhost/lingo")
        );
        assert_eq!(settings.db_max_connections(), 4);
        assert_eq!(settings.jwt_issuer.as_deref(), Some("https://issuer.example"));
        assert!(settings.allow_fixture_tokens);
        assert!(!settings.run_migrations);
        assert_eq!(settings.tts_endpoint(), Some("https://tts.example/v1/speak"));
        assert_eq!(settings.tts_timeout(), Duration::from_secs(3));
    }

    #[rstest]
    fn blank_values_fall_back_to_defaults() {
        let _guard = lock_env(cleared_with(&[
            ("LINGO_DATABASE_URL", "  "),
            ("LINGO_TTS_ENDPOINT", ""),
            ("LINGO_TTS_TIMEOUT_SECS", "0"),
        ]));

        let settings = load_from_empty_args();
        assert!(settings.database_url().is_none());
        assert!(settings.tts_endpoint().is_none());
        assert_eq!(settings.tts_timeout(), Duration::from_secs(10));
    }

    #[rstest]
    fn malformed_bind_addresses_are_reported() {
        let _guard = lock_env(cleared_with(&[("LINGO_BIND_ADDR", "not-an-address")]));

        let settings = load_from_empty_args();
        assert!(settings.bind_addr().is_err());
    }
}
