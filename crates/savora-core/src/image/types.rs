//! Image generation types
//!
//! Request and outcome types for the vendor's CVProcess endpoint.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};

/// Default generation model (req_key)
pub const DEFAULT_MODEL: &str = "high_aes_general_v21_L";

/// Default scheduler configuration
pub const DEFAULT_SCHEDULE_CONF: &str = "general_v20_9B_pe";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_schedule_conf() -> String {
    DEFAULT_SCHEDULE_CONF.to_string()
}

/// Request for text-to-image generation
///
/// Field names and order are the wire format: the struct serializes
/// directly into the request body. `freeze` must be called exactly once
/// per request and its output passed both to the signer and onto the
/// wire, since re-serialization would change the payload hash.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Model identifier
    pub req_key: String,
    /// Text description of the image to generate
    pub prompt: String,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Let the vendor rewrite the prompt before generation
    pub use_pre_llm: bool,
    /// Apply super-resolution to the output
    pub use_sr: bool,
    /// Return a URL instead of inline image data
    pub return_url: bool,
    /// Scheduler configuration
    pub schedule_conf: String,
    /// Watermark settings
    pub logo_info: LogoInfo,
}

/// Watermark settings for generated images
#[derive(Debug, Clone, Serialize)]
pub struct LogoInfo {
    pub add_logo: bool,
}

impl GenerationRequest {
    /// Create a new generation request with the given prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            req_key: default_model(),
            prompt: prompt.into(),
            width: 1024,
            height: 1024,
            use_pre_llm: true,
            use_sr: true,
            return_url: true,
            schedule_conf: default_schedule_conf(),
            logo_info: LogoInfo { add_logo: false },
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.req_key = model.into();
        self
    }

    /// Set the output dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the scheduler configuration
    pub fn with_schedule_conf(mut self, schedule_conf: impl Into<String>) -> Self {
        self.schedule_conf = schedule_conf.into();
        self
    }

    /// Serialize once to the exact bytes that are signed and transmitted
    pub fn freeze(&self) -> Result<String> {
        if self.prompt.is_empty() {
            return Err(Error::InvalidInput("prompt must not be empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidInput(
                "width and height must be positive".to_string(),
            ));
        }
        serde_json::to_string(self)
            .map_err(|e| Error::InvalidInput(format!("failed to serialize request body: {e}")))
    }
}

/// Outcome of one generation call
///
/// Every failure mode folds into `Failure` so callers can render a
/// user-facing message without matching on error internals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    /// Image URLs in the order the vendor returned them
    Success { image_urls: Vec<String> },
    /// Structured failure; `code` is fixed at -1
    Failure { code: i32, message: String },
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// First image URL, if any
    pub fn first_url(&self) -> Option<&str> {
        match self {
            Self::Success { image_urls } => image_urls.first().map(String::as_str),
            Self::Failure { .. } => None,
        }
    }
}

impl From<Error> for GenerationResult {
    fn from(error: Error) -> Self {
        Self::Failure {
            code: -1,
            message: error.to_string(),
        }
    }
}

/// A generated image materialized on disk
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    /// Full path of the written file
    pub path: PathBuf,
    /// Directory the file lives in
    pub directory: PathBuf,
}
