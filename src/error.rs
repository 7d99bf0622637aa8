//! Error handling and custom error types
//!
//! Provides unified error handling across the service using thiserror.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Upstream call timed out after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Service not ready: {0}")]
    ServiceNotReady(String),
}

impl Error {
    /// Whether the failure came from talking to the upstream service.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::AiProvider(_) | Error::UpstreamTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
