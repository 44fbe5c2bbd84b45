//! Savora Core Library
//!
//! This crate provides the core functionality for Savora, including:
//! - Commands (recommend, another, image, config, doctor)
//! - Volcengine-compatible request signing (HMAC-SHA256)
//! - Image generation client (CVProcess API)
//! - LLM integration (OpenRouter API)
//! - Weather lookup (wttr.in)
//! - Dish catalog and recommendation engine
//! - Session-scoped recommendation history

pub mod commands;
pub mod config;
pub mod error;
pub mod image;
pub mod llm;
pub mod recommend;
pub mod session;
pub mod signing;
pub mod weather;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::recommend::{RecommendRequest, Recommendation, RecommendationEngine};
}
