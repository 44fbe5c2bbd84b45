//! Error types for Savora

use thiserror::Error;

/// Result type alias using Savora's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Savora error types with helpful messages and suggestions
///
/// Display strings for the network-facing variants double as the
/// user-facing failure messages, so their wording is part of the
/// public contract.
#[derive(Error, Debug)]
pub enum Error {
    // Credential errors (E001-E099)
    #[error(
        "Missing image API credentials. Set the VOLC_ACCESS_KEY and VOLC_SECRET_KEY environment variables."
    )]
    MissingCredentials,

    // Network errors (E100-E199)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    // Vendor errors (E200-E299)
    #[error("{message}")]
    Vendor { code: String, message: String },

    #[error("no image urls in response")]
    NoImageInResponse,

    // Download errors (E300-E399)
    #[error("Download failed: {0}")]
    Download(String),

    // Capability errors (E400-E499)
    #[error("LLM API error: {0}. Check your API key with `savora config get llm.api_key`.")]
    Llm(String),

    #[error("Weather lookup failed: {0}")]
    Weather(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "E001",
            Self::Transport(_) => "E100",
            Self::HttpStatus(_) => "E101",
            Self::Vendor { .. } => "E200",
            Self::NoImageInResponse => "E201",
            Self::Download(_) => "E300",
            Self::Llm(_) => "E400",
            Self::Weather(_) => "E401",
            Self::Config(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::MissingCredentials => {
                Some("Set VOLC_ACCESS_KEY and VOLC_SECRET_KEY".to_string())
            }
            Self::Transport(_) => Some("Check internet connection".to_string()),
            Self::Llm(_) => Some("savora config get llm.api_key".to_string()),
            Self::Config(_) => Some("savora config list".to_string()),
            _ => None,
        }
    }
}
