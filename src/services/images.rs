use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when looking up breed images
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("API key not configured")]
    NotConfigured,

    #[error("Breed not found: {0}")]
    NotFound(String),

    #[error("No image available for this breed")]
    NoImage,

    #[error("Failed to fetch breed data: {0}")]
    ApiError(u16),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct BreedSearchEntry {
    #[serde(default)]
    image: Option<BreedImage>,
}

#[derive(Debug, Deserialize)]
struct BreedImage {
    #[serde(default)]
    url: Option<String>,
}

/// The Dog API client for breed reference images
pub struct DogImageClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl DogImageClient {
    /// Create a new image client; lookups fail with `NotConfigured` without a key
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self, ImageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// Reference image URL of the first breed matching the name
    pub async fn image_url(&self, breed_name: &str) -> Result<String, ImageError> {
        let api_key = self.api_key.as_deref().ok_or(ImageError::NotConfigured)?;

        let url = format!(
            "{}/breeds/search?q={}",
            self.base_url,
            urlencoding::encode(&breed_name.to_lowercase())
        );

        tracing::debug!("Looking up image for breed: {}", breed_name);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImageError::ApiError(response.status().as_u16()));
        }

        let breeds: Vec<BreedSearchEntry> = response.json().await?;

        let first = breeds
            .into_iter()
            .next()
            .ok_or_else(|| ImageError::NotFound(breed_name.to_string()))?;

        first
            .image
            .and_then(|image| image.url)
            .ok_or(ImageError::NoImage)
    }
}
