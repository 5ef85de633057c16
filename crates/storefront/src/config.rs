//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront, used for OAuth redirects
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 8080)
//! - `STOREFRONT_LOG_FORMAT` - `pretty` (default) or `json`
//! - `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET` - GitHub sign-in (both or neither)
//! - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` - Google sign-in (both or neither)
//!
//! Client secrets are rejected if they look like placeholders or have low entropy.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Third-party sign-in providers
    pub oauth: OAuthConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag (e.g. `production`)
    pub sentry_environment: Option<String>,
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Configured OAuth sign-in providers. A `None` provider is disabled.
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    pub github: Option<OAuthClientConfig>,
    pub google: Option<OAuthClientConfig>,
}

/// OAuth application credentials.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host: IpAddr = parse_env_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port: u16 = parse_env_or("STOREFRONT_PORT", "8080")?;
        let log_format: LogFormat = parse_env_or("STOREFRONT_LOG_FORMAT", "pretty")?;

        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let oauth = OAuthConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            oauth,
            log_format,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute URL for a path on this storefront.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

impl OAuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            github: oauth_client(
                ("GITHUB_CLIENT_ID", get_optional_env("GITHUB_CLIENT_ID")),
                ("GITHUB_CLIENT_SECRET", get_optional_env("GITHUB_CLIENT_SECRET")),
            )?,
            google: oauth_client(
                ("GOOGLE_CLIENT_ID", get_optional_env("GOOGLE_CLIENT_ID")),
                ("GOOGLE_CLIENT_SECRET", get_optional_env("GOOGLE_CLIENT_SECRET")),
            )?,
        })
    }
}

/// Build an OAuth client from an id/secret pair; a half-configured pair is an error.
fn oauth_client(
    (id_key, id): (&str, Option<String>),
    (secret_key, secret): (&str, Option<String>),
) -> Result<Option<OAuthClientConfig>, ConfigError> {
    match (id, secret) {
        (None, None) => Ok(None),
        (Some(client_id), Some(client_secret)) => {
            validate_secret_strength(&client_secret, secret_key)?;
            Ok(Some(OAuthClientConfig {
                client_id,
                client_secret: SecretString::from(client_secret),
            }))
        }
        (Some(_), None) => Err(ConfigError::MissingEnvVar(secret_key.to_string())),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar(id_key.to_string())),
    }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// `STOREFRONT_DATABASE_URL`, or the `DATABASE_URL` that sqlx tooling reads.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse `key`, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject client secrets copied from a README or typed by hand.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(var_name.to_string(), reason);

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(insecure(format!(
            "appears to be a placeholder (contains '{pattern}')"
        )));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!(shannon_entropy("eeeeee").abs() < f64::EPSILON);
        assert!((shannon_entropy("EADGBE") - 2.252).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        for weak in ["your-github-secret", "changeme123", "0000000000000000000000"] {
            assert!(
                matches!(
                    validate_secret_strength(weak, "GITHUB_CLIENT_SECRET"),
                    Err(ConfigError::InsecureSecret(_, _))
                ),
                "{weak} should be rejected"
            );
        }
        assert!(
            validate_secret_strength("3f9aK7qL0mZ2xV8cB5nR1tW6", "GITHUB_CLIENT_SECRET").is_ok()
        );
    }

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            base_url: "http://localhost:8080/".to_string(),
            oauth: OAuthConfig::default(),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_absolute_url_joins_without_double_slash() {
        let config = test_config();
        assert_eq!(
            config.absolute_url("/api/sessions/github/callback"),
            "http://localhost:8080/api/sessions/github/callback"
        );
        assert!(!config.is_https());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_oauth_client_pairs() {
        let none = oauth_client(("ID", None), ("SECRET", None)).unwrap();
        assert!(none.is_none());

        let both = oauth_client(
            ("ID", Some("abc".to_string())),
            ("SECRET", Some("9fT2kQ7xLm4Rv8Zc1Wb6".to_string())),
        )
        .unwrap()
        .unwrap();
        assert_eq!(both.client_id, "abc");

        let half = oauth_client(("ID", Some("abc".to_string())), ("SECRET", None));
        assert!(matches!(half, Err(ConfigError::MissingEnvVar(key)) if key == "SECRET"));

        let placeholder = oauth_client(
            ("ID", Some("abc".to_string())),
            ("SECRET", Some("your-client-secret".to_string())),
        );
        assert!(matches!(placeholder, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_oauth_config_debug_redacts_secret() {
        let config = OAuthClientConfig {
            client_id: "client_id_value".to_string(),
            client_secret: SecretString::from("super_secret_client_secret"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));
    }
}
