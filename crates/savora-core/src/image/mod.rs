//! Image generation module
//!
//! Signed text-to-image generation against the vendor endpoint:
//! - Request construction with a frozen JSON body
//! - Response classification into success or structured failure
//! - Download of generated images into a managed output directory

pub mod client;
pub mod operations;
pub mod types;

pub use client::{ImageClient, ImageClientBuilder};
pub use operations::{cleanup_output_dir, food_prompt, generate_dish_image, generate_image_to_file};
pub use types::{
    DEFAULT_MODEL, DEFAULT_SCHEDULE_CONF, DownloadedImage, GenerationRequest, GenerationResult,
};
