//! Image generation client for the vendor's CVProcess endpoint
//!
//! Builds the frozen request body, signs it, POSTs it, and classifies the
//! response into a `GenerationResult`. Successful generations hand back
//! pre-signed image URLs which `download` materializes on disk. No retries
//! live here; retry policy belongs to the caller.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::signing::{Credentials, RequestSigner, SigningContext, canonical_query_string};

use super::types::{DownloadedImage, GenerationRequest, GenerationResult};

/// Default endpoint host
const DEFAULT_HOST: &str = "visual.volcengineapi.com";

/// Default credential scope region
const DEFAULT_REGION: &str = "cn-north-1";

/// Default credential scope service
const DEFAULT_SERVICE: &str = "cv";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fixed API action/version query pair
const ACTION: &str = "CVProcess";
const VERSION: &str = "2022-08-31";

/// Vendor success code in the flat response envelope
const VENDOR_SUCCESS_CODE: i64 = 10000;

/// Client for signed image generation calls
#[derive(Clone)]
pub struct ImageClient {
    http_client: HttpClient,
    signer: RequestSigner,
    base_url: String,
    host: String,
    region: String,
    service: String,
    output_dir: PathBuf,
}

impl std::fmt::Debug for ImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClient")
            .field("base_url", &self.base_url)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

/// Builder for ImageClient
pub struct ImageClientBuilder {
    credentials: Option<Credentials>,
    base_url: Option<String>,
    host: Option<String>,
    region: Option<String>,
    service: Option<String>,
    timeout_secs: Option<u64>,
    output_dir: Option<PathBuf>,
}

impl Default for ImageClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            credentials: None,
            base_url: None,
            host: None,
            region: None,
            service: None,
            timeout_secs: None,
            output_dir: None,
        }
    }

    /// Set the API credentials
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the endpoint URL (the signing host is set separately)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the endpoint host used for signing and the default URL
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the credential scope region
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the credential scope service
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Set the directory downloaded images are written to
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Build the ImageClient
    pub fn build(self) -> Result<ImageClient> {
        let credentials = self.credentials.ok_or(Error::MissingCredentials)?;

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Transport)?;

        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let base_url = self.base_url.unwrap_or_else(|| format!("https://{host}"));

        Ok(ImageClient {
            http_client,
            signer: RequestSigner::new(credentials),
            base_url,
            host,
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            service: self.service.unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            output_dir: self
                .output_dir
                .unwrap_or_else(|| std::env::temp_dir().join("savora-images")),
        })
    }
}

impl ImageClient {
    /// Create a new builder
    pub fn builder() -> ImageClientBuilder {
        ImageClientBuilder::new()
    }

    /// Directory downloaded images are written to
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Run one generation call end to end
    ///
    /// The call is atomic from the caller's perspective: a list of image
    /// URLs or a failure reason, never an `Err` across this boundary.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        info!(model = %request.req_key, width = request.width, height = request.height, "generating image");

        match self.try_generate(request).await {
            Ok(image_urls) => GenerationResult::Success { image_urls },
            Err(error) => {
                warn!(error = %error, code = error.code(), "image generation failed");
                GenerationResult::from(error)
            }
        }
    }

    async fn try_generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        // Frozen once; the signer and the wire see identical bytes.
        let body = request.freeze()?;
        let query = action_query();
        let canonical_query = canonical_query_string(&query);

        let context = SigningContext::new(
            self.host.clone(),
            self.region.clone(),
            self.service.clone(),
        );
        let headers = self.signer.sign(&context, &query, &body)?;

        let url = format!("{}/?{canonical_query}", self.base_url);
        debug!(url = %url, "sending generation request");

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", &headers.content_type)
            .header("X-Date", &headers.x_date)
            .header("X-Content-Sha256", &headers.x_content_sha256)
            .header("Authorization", &headers.authorization)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        let envelope: VendorResponse = response.json().await?;
        classify(envelope)
    }

    /// Download a generated image into the output directory
    ///
    /// The URL is pre-signed by the vendor, so the GET carries no auth.
    /// The file is named `<subject>_<8 hex>.jpg`; the unique suffix keeps
    /// concurrent writers from colliding.
    pub async fn download(&self, url: &str, subject: &str) -> Result<DownloadedImage> {
        debug!(url = %url, subject = %subject, "downloading generated image");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!("HTTP {} fetching {url}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Download(e.to_string()))?;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| Error::Download(format!("{}: {e}", self.output_dir.display())))?;

        let suffix = Uuid::new_v4().simple().to_string();
        let filename = format!("{}_{}.jpg", sanitize_subject(subject), &suffix[..8]);
        let path = self.output_dir.join(filename);

        std::fs::write(&path, &bytes).map_err(|e| Error::Download(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), bytes = bytes.len(), "image downloaded");

        Ok(DownloadedImage {
            path,
            directory: self.output_dir.clone(),
        })
    }
}

fn action_query() -> BTreeMap<String, String> {
    let mut query = BTreeMap::new();
    query.insert("Action".to_string(), ACTION.to_string());
    query.insert("Version".to_string(), VERSION.to_string());
    query
}

// Path separators in the subject would escape the output directory.
fn sanitize_subject(subject: &str) -> String {
    subject.replace(['/', '\\'], "-")
}

/// Classify a 2xx response body
///
/// An explicit vendor error object wins over everything; otherwise a
/// non-empty image list is a success and anything else is a protocol
/// anomaly.
fn classify(envelope: VendorResponse) -> Result<Vec<String>> {
    if let Some(error) = envelope.metadata.and_then(|m| m.error) {
        return Err(Error::Vendor {
            code: error.code,
            message: error.message,
        });
    }

    if let (Some(code), Some(message)) = (envelope.code, &envelope.message) {
        if code != VENDOR_SUCCESS_CODE {
            return Err(Error::Vendor {
                code: code.to_string(),
                message: message.clone(),
            });
        }
    }

    let image_urls: Vec<String> = envelope
        .result
        .and_then(|r| r.images)
        .map(|images| images.into_iter().map(|image| image.url).collect())
        .unwrap_or_default();

    if image_urls.is_empty() {
        return Err(Error::NoImageInResponse);
    }

    Ok(image_urls)
}

/// Vendor response envelope
///
/// Two shapes exist in the wild: the classic one with `Result.Images` and
/// `ResponseMetadata.Error`, and a flat one with top-level `code`/`message`.
#[derive(Debug, Deserialize)]
struct VendorResponse {
    #[serde(rename = "Result")]
    result: Option<VendorResult>,
    #[serde(rename = "ResponseMetadata")]
    metadata: Option<ResponseMetadata>,
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VendorResult {
    #[serde(rename = "Images")]
    images: Option<Vec<VendorImage>>,
}

#[derive(Debug, Deserialize)]
struct VendorImage {
    #[serde(rename = "Url")]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(rename = "Error")]
    error: Option<VendorError>,
}

#[derive(Debug, Deserialize)]
struct VendorError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}
