//! Image generation commands
//!
//! CLI command implementations for image generation operations.

use tracing::{info, warn};

use crate::config::{Config, ImageConfig};
use crate::error::{Error, Result};
use crate::image::{
    DownloadedImage, GenerationRequest, ImageClient, cleanup_output_dir, generate_image_to_file,
};

/// Build a generation request carrying the configured model parameters
pub fn request_from_config(image: &ImageConfig, prompt: impl Into<String>) -> GenerationRequest {
    GenerationRequest::new(prompt)
        .with_model(image.model.clone())
        .with_schedule_conf(image.schedule_conf.clone())
        .with_size(image.width, image.height)
}

/// Build an image client from configuration, if credentials resolve
///
/// Returns `None` when the credential environment variables are unset so
/// callers can degrade instead of failing.
pub fn configured_client(config: &Config) -> Result<Option<ImageClient>> {
    let credentials = match config
        .image
        .resolved_credentials()
        .map_err(|e| Error::Config(e.to_string()))?
    {
        Some(credentials) => credentials,
        None => return Ok(None),
    };

    let output_dir = config
        .image
        .resolved_output_dir()
        .map_err(|e| Error::Config(e.to_string()))?;

    let client = ImageClient::builder()
        .credentials(credentials)
        .host(config.image.host.clone())
        .region(config.image.region.clone())
        .service(config.image.service.clone())
        .timeout_secs(config.image.timeout_secs)
        .output_dir(output_dir)
        .build()?;

    Ok(Some(client))
}

/// Generate an image from a text prompt
pub async fn generate(
    config: &Config,
    prompt: String,
    width: Option<u32>,
    height: Option<u32>,
    model: Option<String>,
) -> Result<DownloadedImage> {
    let client = configured_client(config)?.ok_or(Error::MissingCredentials)?;

    let mut request = request_from_config(&config.image, prompt);
    if let Some(w) = width {
        request.width = w;
    }
    if let Some(h) = height {
        request.height = h;
    }
    if let Some(m) = model {
        request = request.with_model(m);
    }

    let subject = subject_from_prompt(&request.prompt);
    let image = generate_image_to_file(&client, &request, &subject).await?;

    info!(path = %image.path.display(), "generated image");
    sweep(config);

    Ok(image)
}

/// Remove old images, keeping the configured number of newest ones
pub fn cleanup(config: &Config) -> Result<usize> {
    let dir = config
        .image
        .resolved_output_dir()
        .map_err(|e| Error::Config(e.to_string()))?;
    cleanup_output_dir(&dir, config.image.max_kept_images)
}

/// Run the retention sweep, logging instead of failing
pub(crate) fn sweep(config: &Config) {
    match cleanup(config) {
        Ok(removed) if removed > 0 => info!(removed, "removed old images"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "image retention sweep failed"),
    }
}

/// Derive a filename stem from the first words of the prompt
fn subject_from_prompt(prompt: &str) -> String {
    let slug: String = prompt
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let slug = slug.trim_matches(['_', '-']).to_lowercase();
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_config_carries_settings() {
        let mut config = Config::default();
        config.image.model = "custom_model".to_string();
        config.image.schedule_conf = "custom_schedule".to_string();
        config.image.width = 768;
        config.image.height = 512;

        let request = request_from_config(&config.image, "a bowl of ramen");

        assert_eq!(request.req_key, "custom_model");
        assert_eq!(request.schedule_conf, "custom_schedule");
        assert_eq!(request.width, 768);
        assert_eq!(request.height, 512);
        assert_eq!(request.prompt, "a bowl of ramen");
    }

    #[test]
    fn test_subject_from_prompt_takes_leading_words() {
        assert_eq!(subject_from_prompt("a bowl of ramen"), "a_bowl_of");
        assert_eq!(subject_from_prompt("Mapo Tofu"), "mapo_tofu");
    }

    #[test]
    fn test_subject_from_prompt_strips_punctuation() {
        assert_eq!(subject_from_prompt("\"hot pot\", steaming"), "hot_pot_steaming");
    }

    #[test]
    fn test_subject_from_prompt_empty_falls_back() {
        assert_eq!(subject_from_prompt(""), "image");
        assert_eq!(subject_from_prompt("!!! ???"), "image");
    }
}
