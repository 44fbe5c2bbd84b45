//! High-level image operations
//!
//! Convenience functions layered over `ImageClient`: dish-to-photo
//! generation and output directory retention.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::client::ImageClient;
use super::types::{DownloadedImage, GenerationRequest, GenerationResult};

/// Extensions counted as images by the retention sweep
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Build the photography prompt for a dish
pub fn food_prompt(dish: &str) -> String {
    format!(
        "High quality realistic food photograph, close-up shot, \"{dish}\", \
         food photography, elegant plating, professional lighting, vivid colors, \
         appetizing appearance"
    )
}

/// Generate an image and write it into the client's output directory
///
/// `subject` only names the file on disk; the prompt drives generation.
pub async fn generate_image_to_file(
    client: &ImageClient,
    request: &GenerationRequest,
    subject: &str,
) -> Result<DownloadedImage> {
    match client.generate(request).await {
        GenerationResult::Success { image_urls } => {
            let url = image_urls.first().ok_or(Error::NoImageInResponse)?;
            client.download(url, subject).await
        }
        GenerationResult::Failure { code, message } => Err(Error::Vendor {
            code: code.to_string(),
            message,
        }),
    }
}

/// Generate a photo of a dish using the default model parameters
pub async fn generate_dish_image(client: &ImageClient, dish: &str) -> Result<DownloadedImage> {
    info!(dish = %dish, "generating dish photo");
    let request = GenerationRequest::new(food_prompt(dish));
    generate_image_to_file(client, &request, dish).await
}

/// Delete old images from `dir`, keeping the newest `keep` by mtime
///
/// A concurrent download may add or a concurrent sweep may remove files
/// while this runs, so deletion rechecks existence and treats
/// already-gone files as success. Returns the number of files removed.
pub fn cleanup_output_dir(dir: &Path, keep: usize) -> Result<usize> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        debug!(dir = %dir.display(), "created output directory");
        return Ok(0);
    }

    let mut images: Vec<(std::path::PathBuf, std::time::SystemTime)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !has_image_extension(&path) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        images.push((path, modified));
    }

    if images.len() <= keep {
        debug!(count = images.len(), keep, "no images to clean up");
        return Ok(0);
    }

    // Newest first; everything past `keep` goes.
    images.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in images.drain(keep..) {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed old image");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove old image");
            }
        }
    }

    info!(removed, kept = images.len(), dir = %dir.display(), "output directory cleaned");
    Ok(removed)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
