//! Service-account authentication (OAuth2 JWT bearer grant).

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;

use crate::{config::EarthEngineConfig, error::SessionError};

pub const EARTH_ENGINE_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Environment variable holding the service account JSON on one line.
pub const SERVICE_ACCOUNT_ENV: &str = "SERVICE_ACCOUNT";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

/// The subset of a Google service account key file we need.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// Parse a key blob, normalizing a private key whose newlines arrived as
    /// literal `\n` sequences (typical for single-line env vars).
    pub fn from_json(blob: &str) -> Result<Self, SessionError> {
        let mut account: ServiceAccount = serde_json::from_str(blob)?;
        account.private_key = normalize_private_key(&account.private_key);
        Ok(account)
    }

    /// `env_blob` (the `SERVICE_ACCOUNT` value) wins over the configured file.
    pub fn load(config: &EarthEngineConfig, env_blob: Option<String>) -> Result<Self, SessionError> {
        if let Some(blob) = env_blob.filter(|b| !b.trim().is_empty()) {
            return Self::from_json(&blob);
        }

        let path = config
            .credentials_file
            .as_ref()
            .ok_or(SessionError::MissingCredentials)?;

        let blob = std::fs::read_to_string(path).map_err(|source| SessionError::CredentialsFile {
            path: path.clone(),
            source,
        })?;

        Self::from_json(&blob)
    }
}

pub fn normalize_private_key(key: &str) -> String {
    key.replace("\\n", "\n")
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Mints and caches bearer tokens for one service account.
pub struct TokenSource {
    client_email: String,
    key_id: Option<String>,
    key: EncodingKey,
    token_uri: String,
    http: Client,
    cached: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Fails immediately if the private key is not a usable RSA PEM.
    pub fn new(
        account: &ServiceAccount,
        token_uri: Option<&str>,
        http: Client,
    ) -> Result<Self, SessionError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        let token_uri = token_uri
            .or(account.token_uri.as_deref())
            .unwrap_or(DEFAULT_TOKEN_URI)
            .to_string();

        Ok(Self {
            client_email: account.client_email.clone(),
            key_id: account.private_key_id.clone(),
            key,
            token_uri,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Signed RS256 assertion for the token endpoint.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, jsonwebtoken::errors::Error> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        let claims = Claims {
            iss: &self.client_email,
            scope: EARTH_ENGINE_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &self.key)
    }

    /// A valid bearer token, refreshed if the cached one is about to expire.
    pub async fn bearer(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.fetch(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        let assertion = self
            .assertion(now)
            .context("Failed to sign service account assertion")?;

        let res = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to token endpoint")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read token endpoint response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Token request failed with status {}: {}",
                status,
                oauth_error_message(&body),
            ));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).context("Failed to parse token endpoint JSON")?;

        tracing::debug!(
            client_email = %self.client_email,
            expires_in = parsed.expires_in,
            "obtained access token"
        );

        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: now + Duration::seconds(parsed.expires_in),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn oauth_error_message(body: &str) -> String {
    match serde_json::from_str::<OAuthError>(body) {
        Ok(OAuthError { error, error_description: Some(desc) }) => format!("{error}: {desc}"),
        Ok(OAuthError { error, .. }) => error,
        Err(_) => super::earthengine::truncate_body(body),
    }
}
