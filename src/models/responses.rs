use serde::{Deserialize, Serialize};
use crate::models::domain::{BreedProfile, Recommendation, ScoredBreed};

/// Response for the recommendation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendation: Recommendation,
}

/// Response for the chat search tool endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedSearchResponse {
    pub breeds: Vec<ScoredBreed>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response for a single breed lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedResponse {
    pub breed: BreedProfile,
}

/// Response for the breed name catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedListResponse {
    pub breeds: Vec<String>,
    pub count: usize,
}

/// Response for the dog image endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DogImageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
