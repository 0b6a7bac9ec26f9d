use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// A request the client got wrong. Reported as 400, never logged as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request body is not a JSON object")]
    NotAnObject,

    #[error("`{0}` is missing or null")]
    Missing(&'static str),

    #[error("`{0}` is not a number")]
    NotANumber(&'static str),

    #[error("`{0}` is zero")]
    Zero(&'static str),
}

impl ValidationError {
    /// The only text clients ever see for a validation failure.
    pub const MESSAGE: &'static str = "lat and lon are required";
}

/// Failure talking to the imagery platform while answering a request.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{0:#}")]
    Platform(anyhow::Error),

    #[error("imagery platform did not answer within {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

/// Failure establishing the platform session at startup.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no service account configured (set SERVICE_ACCOUNT or earth_engine.credentials_file)")]
    MissingCredentials,

    #[error("failed to read credentials file {}: {source}", path.display())]
    CredentialsFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("service account credentials are not valid JSON: {0}")]
    Credentials(#[from] serde_json::Error),

    #[error("invalid service account private key: {0}")]
    PrivateKey(#[from] jsonwebtoken::errors::Error),

    #[error("no Earth Engine project configured and the service account has no project_id")]
    MissingProject,

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0:#}")]
    Token(anyhow::Error),

    #[error("authentication did not complete within {}s", .0.as_secs_f32())]
    Timeout(Duration),
}
