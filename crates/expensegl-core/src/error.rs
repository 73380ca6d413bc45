//! Error types for expensegl

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Message for API callers, without the variant prefix
    pub fn client_message(&self) -> String {
        match self {
            Self::NotConfigured(m) | Self::Upstream(m) | Self::InvalidData(m) | Self::NotFound(m) => {
                m.clone()
            }
            other => other.to_string(),
        }
    }
}
