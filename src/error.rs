use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum ZapError {
    #[error("Unauthorized: missing or invalid access token")]
    Unauthorized,

    #[error("An instance already exists for this profile")]
    AlreadyExists,

    #[error("Instance not found. Please initialize first.")]
    InstanceNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Uazapi error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ZapError {
    /// HTTP-equivalent status code for each failure kind, matching the
    /// rejection codes of the hosted connection-manager endpoint.
    pub fn http_status(&self) -> u16 {
        match self {
            ZapError::Unauthorized => 401,
            ZapError::AlreadyExists => 409,
            ZapError::InstanceNotFound => 404,
            ZapError::Validation(_) => 400,
            ZapError::Gateway(_) => 502,
            _ => 500,
        }
    }
}
