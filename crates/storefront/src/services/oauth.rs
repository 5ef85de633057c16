//! GitHub and Google sign-in.
//!
//! Authorization-code flow only: redirect to the provider with a random
//! `state`, then exchange the returned code for an access token and read the
//! user's verified email and name.

use rand::{Rng, distr::Alphanumeric};
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use riffhouse_core::{AuthProvider, Email};

use super::auth::OAuthIdentity;
use crate::config::{OAuthClientConfig, StorefrontConfig};

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";
const GITHUB_EMAILS_URL: &str = "https://api.github.com/user/emails";

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const STATE_LEN: usize = 32;

/// Errors from the OAuth flow.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Unknown provider name, or no credentials configured for it.
    #[error("oauth provider not available")]
    NotConfigured,

    /// The callback `state` does not match the one stored in the session.
    #[error("oauth state mismatch")]
    StateMismatch,

    /// The provider redirected back with an error instead of a code.
    #[error("oauth authorization denied: {0}")]
    Denied(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),

    /// The provider has no verified email for this account.
    #[error("no verified email")]
    EmailNotVerified,
}

/// Parse a provider name from a URL path segment.
#[must_use]
pub fn provider_from_path(name: &str) -> Option<AuthProvider> {
    match name {
        "github" => Some(AuthProvider::Github),
        "google" => Some(AuthProvider::Google),
        _ => None,
    }
}

/// A fresh CSRF `state` value.
#[must_use]
pub fn new_state() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// OAuth client for the configured providers.
#[derive(Clone)]
pub struct OAuthService {
    http: Client,
    base_url: String,
    github: Option<OAuthClientConfig>,
    google: Option<OAuthClientConfig>,
}

impl OAuthService {
    #[must_use]
    pub fn new(config: &StorefrontConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            github: config.oauth.github.clone(),
            google: config.oauth.google.clone(),
        }
    }

    /// Whether sign-in with `provider` is available.
    #[must_use]
    pub fn is_enabled(&self, provider: AuthProvider) -> bool {
        self.client(provider).is_ok()
    }

    fn client(&self, provider: AuthProvider) -> Result<&OAuthClientConfig, OAuthError> {
        match provider {
            AuthProvider::Github => self.github.as_ref(),
            AuthProvider::Google => self.google.as_ref(),
            AuthProvider::Local => None,
        }
        .ok_or(OAuthError::NotConfigured)
    }

    /// Where the provider sends the user back to.
    #[must_use]
    pub fn redirect_uri(&self, provider: AuthProvider) -> String {
        format!("{}/api/sessions/{provider}/callback", self.base_url)
    }

    /// The provider's consent page for this sign-in attempt.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::NotConfigured` if the provider has no credentials.
    pub fn authorization_url(
        &self,
        provider: AuthProvider,
        state: &str,
    ) -> Result<Url, OAuthError> {
        let client = self.client(provider)?;
        let redirect_uri = self.redirect_uri(provider);
        let (endpoint, scope) = match provider {
            AuthProvider::Github => (GITHUB_AUTHORIZE_URL, "read:user user:email"),
            _ => (GOOGLE_AUTHORIZE_URL, "openid email profile"),
        };

        Url::parse_with_params(
            endpoint,
            &[
                ("client_id", client.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope),
                ("state", state),
            ],
        )
        .map_err(|_| OAuthError::NotConfigured)
    }

    /// Exchange an authorization code for the user's identity.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::TokenExchange` or `OAuthError::UserInfo` when the
    /// provider rejects a request, and `OAuthError::EmailNotVerified` when it
    /// has no verified email for the account.
    pub async fn identify(
        &self,
        provider: AuthProvider,
        code: &str,
    ) -> Result<OAuthIdentity, OAuthError> {
        let client = self.client(provider)?;
        let token_url = match provider {
            AuthProvider::Github => GITHUB_TOKEN_URL,
            _ => GOOGLE_TOKEN_URL,
        };
        let access_token = self.exchange_code(client, token_url, provider, code).await?;

        match provider {
            AuthProvider::Github => self.github_identity(&access_token).await,
            _ => self.google_identity(&access_token).await,
        }
    }

    async fn exchange_code(
        &self,
        client: &OAuthClientConfig,
        token_url: &str,
        provider: AuthProvider,
        code: &str,
    ) -> Result<String, OAuthError> {
        let redirect_uri = self.redirect_uri(provider);
        let params = [
            ("code", code),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.expose_secret()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%provider, %status, body = %body, "OAuth token exchange failed");
            return Err(OAuthError::TokenExchange(format!("status {status}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        token.access_token.ok_or_else(|| {
            OAuthError::TokenExchange(
                token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| "no access token".to_owned()),
            )
        })
    }

    async fn github_identity(&self, access_token: &str) -> Result<OAuthIdentity, OAuthError> {
        let user: GithubUser = self.github_get(GITHUB_USER_URL, access_token).await?;
        let emails: Vec<GithubEmail> = self.github_get(GITHUB_EMAILS_URL, access_token).await?;

        let email = emails
            .iter()
            .filter(|e| e.verified)
            .max_by_key(|e| e.primary)
            .and_then(|e| Email::parse(&e.email).ok())
            .ok_or(OAuthError::EmailNotVerified)?;

        let name = user.name.unwrap_or(user.login);
        let (first_name, last_name) = split_name(&name);

        Ok(OAuthIdentity {
            provider: AuthProvider::Github,
            email,
            first_name,
            last_name,
        })
    }

    async fn github_get<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, OAuthError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(USER_AGENT, "riffhouse-storefront")
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| OAuthError::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, url, "GitHub API request failed");
            return Err(OAuthError::UserInfo(format!("status {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfo(e.to_string()))
    }

    async fn google_identity(&self, access_token: &str) -> Result<OAuthIdentity, OAuthError> {
        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "Google userinfo request failed");
            return Err(OAuthError::UserInfo(format!("status {status}")));
        }

        let user: GoogleUser = response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfo(e.to_string()))?;

        if !user.email_verified {
            tracing::warn!("Google account email not verified");
            return Err(OAuthError::EmailNotVerified);
        }
        let email = Email::parse(&user.email).map_err(|_| OAuthError::EmailNotVerified)?;

        Ok(OAuthIdentity {
            provider: AuthProvider::Google,
            email,
            first_name: user.given_name.unwrap_or_default(),
            last_name: user.family_name.unwrap_or_default(),
        })
    }
}

/// Split a display name at its first space.
fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, last)) => (first.to_owned(), last.trim().to_owned()),
        None => (name.trim().to_owned(), String::new()),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct GoogleUser {
    email: String,
    #[serde(default)]
    email_verified: bool,
    given_name: Option<String>,
    family_name: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(github: bool) -> OAuthService {
        OAuthService {
            http: Client::new(),
            base_url: "https://shop.example.com".to_owned(),
            github: github.then(|| OAuthClientConfig {
                client_id: "gh-client".to_owned(),
                client_secret: SecretString::from("gh-secret".to_owned()),
            }),
            google: None,
        }
    }

    #[test]
    fn test_provider_from_path() {
        assert_eq!(provider_from_path("github"), Some(AuthProvider::Github));
        assert_eq!(provider_from_path("google"), Some(AuthProvider::Google));
        assert_eq!(provider_from_path("local"), None);
    }

    #[test]
    fn test_authorization_url_carries_state_and_callback() {
        let url = service(true)
            .authorization_url(AuthProvider::Github, "abc123")
            .unwrap();
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with(GITHUB_AUTHORIZE_URL));
        assert!(params.contains(&("state".to_owned(), "abc123".to_owned())));
        assert!(params.contains(&("client_id".to_owned(), "gh-client".to_owned())));
        assert!(params.contains(&(
            "redirect_uri".to_owned(),
            "https://shop.example.com/api/sessions/github/callback".to_owned()
        )));
    }

    #[test]
    fn test_unconfigured_provider() {
        let oauth = service(false);
        assert!(!oauth.is_enabled(AuthProvider::Github));
        assert!(matches!(
            oauth.authorization_url(AuthProvider::Google, "s"),
            Err(OAuthError::NotConfigured)
        ));
    }

    #[test]
    fn test_state_is_random() {
        let a = new_state();
        assert_eq!(a.len(), STATE_LEN);
        assert_ne!(a, new_state());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Jimi Hendrix"),
            ("Jimi".to_owned(), "Hendrix".to_owned())
        );
        assert_eq!(split_name("prince"), ("prince".to_owned(), String::new()));
    }
}
