// src/error.rs

use thiserror::Error;

// Error type for the Ahgora client
#[derive(Error, Debug)]
pub enum AhgoraError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Not authenticated: call login() first")]
    NotAuthenticated,

    #[error("Punches table not found in the response (found {found} table(s), expected 2)")]
    TableNotFound { found: usize },

    #[error("Failed to parse the response: {0}")]
    ParseFailure(String),

    #[error("Malformed punch: could not parse '{date} {token}' with format '{format}'")]
    MalformedPunch {
        date: String,
        token: String,
        format: String,
    },

    #[error("JSON decoding failed: {0}")]
    JsonDecode(#[from] serde_json::Error),

    #[error("Ahgora backend error: {0}")]
    BackendError(String),

    #[error("The request returned http status {0}")]
    UnexpectedStatus(u16),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid HTTP header: {0}")]
    InvalidHeader(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, AhgoraError>;
