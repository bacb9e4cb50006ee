use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use crate::core::filters::FilterExpression;
use crate::models::{BreedRecord, SearchHit};

/// Errors that can occur when talking to the vector index
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Search backend returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// A similarity query against the breed index
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub text: String,
    pub top_k: usize,
    pub filter: Option<FilterExpression>,
}

/// Similarity search over breed records
///
/// Implementations hold no per-request state and are shared by every
/// request through an `Arc`.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a semantic query, optionally restricted by a metadata filter
    async fn query(&self, request: &QueryRequest) -> Result<Vec<SearchHit>, SearchError>;

    /// Fetch one record by id; `Ok(None)` when the id is unknown
    async fn fetch(&self, id: &str) -> Result<Option<BreedRecord>, SearchError>;
}

/// Upstash Vector REST client
///
/// Records are stored with the breed name as vector id and the breed
/// metadata alongside; queries embed raw text server-side.
pub struct UpstashClient {
    base_url: String,
    token: String,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryDataBody<'a> {
    data: &'a str,
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchBody<'a> {
    ids: [&'a str; 1],
    include_metadata: bool,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StoredVector {
    id: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl UpstashClient {
    /// Create a new Upstash client
    pub fn new(base_url: String, token: String, timeout_secs: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SearchError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(SearchError::ApiError { status, body });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        match (envelope.result, envelope.error) {
            (_, Some(error)) => Err(SearchError::InvalidResponse(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(SearchError::InvalidResponse("Missing result".into())),
        }
    }
}

#[async_trait]
impl SearchBackend for UpstashClient {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<SearchHit>, SearchError> {
        let body = QueryDataBody {
            data: &request.text,
            top_k: request.top_k,
            include_metadata: true,
            filter: request.filter.as_ref().map(ToString::to_string),
        };

        let vectors: Vec<StoredVector> = self.post("query-data", &body).await?;
        let total = vectors.len();
        let mut first_error: Option<String> = None;

        let hits: Vec<SearchHit> = vectors
            .into_iter()
            .filter_map(|vector| {
                let Some(metadata) = vector.metadata else {
                    first_error.get_or_insert_with(|| format!("hit {} has no metadata", vector.id));
                    return None;
                };
                match serde_json::from_value::<BreedRecord>(metadata) {
                    Ok(record) => Some(SearchHit {
                        id: vector.id,
                        score: vector.score.unwrap_or(0.0),
                        record,
                    }),
                    Err(e) => {
                        tracing::warn!("Skipping hit {} with unreadable metadata: {}", vector.id, e);
                        first_error.get_or_insert_with(|| format!("hit {}: {}", vector.id, e));
                        None
                    }
                }
            })
            .collect();

        // Results that exist but cannot be read are a backend failure, not an empty tier
        if hits.is_empty() {
            if let Some(error) = first_error {
                return Err(SearchError::InvalidResponse(format!(
                    "No readable breed metadata in {} hits ({})",
                    total, error
                )));
            }
        }

        tracing::debug!("Query returned {} hits ({} usable)", total, hits.len());

        Ok(hits)
    }

    async fn fetch(&self, id: &str) -> Result<Option<BreedRecord>, SearchError> {
        let body = FetchBody {
            ids: [id],
            include_metadata: true,
        };

        let vectors: Vec<Option<StoredVector>> = self.post("fetch", &body).await?;

        let Some(metadata) = vectors.into_iter().flatten().next().and_then(|v| v.metadata) else {
            tracing::debug!("No record stored for {}", id);
            return Ok(None);
        };

        serde_json::from_value(metadata)
            .map(Some)
            .map_err(|e| SearchError::InvalidResponse(format!("Failed to parse breed {}: {}", id, e)))
    }
}

/// Backend over a fixed list of hits
///
/// Filters are evaluated locally with `FilterExpression::matches`; hits keep
/// their stored score and insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    hits: Vec<SearchHit>,
}

impl InMemoryBackend {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<SearchHit>, SearchError> {
        Ok(self
            .hits
            .iter()
            .filter(|hit| {
                request
                    .filter
                    .as_ref()
                    .map_or(true, |filter| filter.matches(&hit.record))
            })
            .take(request.top_k)
            .cloned()
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<BreedRecord>, SearchError> {
        Ok(self
            .hits
            .iter()
            .find(|hit| hit.id == id)
            .map(|hit| hit.record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> UpstashClient {
        UpstashClient::new(server.url(), "test_token".to_string(), 5).unwrap()
    }

    #[tokio::test]
    async fn test_query_sends_filter_and_parses_hits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query-data")
            .match_header("authorization", "Bearer test_token")
            .match_body(Matcher::PartialJson(json!({
                "data": "calm apartment dog",
                "topK": 8,
                "includeMetadata": true,
                "filter": "(trainabilityValue >= 0.6)"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "result": [
                        { "id": "Pug", "score": 0.81, "metadata": { "breed": "Pug", "popularity": 32 } },
                        { "id": "Broken", "score": 0.7, "metadata": { "description": "no breed" } },
                        { "id": "Bare", "score": 0.6 }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut constraints = crate::models::PreferenceConstraints::new("calm apartment dog");
        constraints.min_trainability_value = Some(0.6);
        let request = QueryRequest {
            text: constraints.search_query.clone(),
            top_k: 8,
            filter: crate::core::filters::build_filter(&constraints),
        };

        let hits = client_for(&server).query(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "Pug");
        assert_eq!(hits[0].record.popularity, Some(32));
        assert!((hits[0].score - 0.81).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_query_omits_missing_filter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query-data")
            .match_body(Matcher::Json(json!({
                "data": "dog breed",
                "topK": 300,
                "includeMetadata": true
            })))
            .with_status(200)
            .with_body(r#"{"result": []}"#)
            .create_async()
            .await;

        let request = QueryRequest {
            text: "dog breed".to_string(),
            top_k: 300,
            filter: None,
        };

        let hits = client_for(&server).query(&request).await.unwrap();

        mock.assert_async().await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_query_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query-data")
            .with_status(429)
            .with_body(r#"{"error": "quota exceeded", "status": 429}"#)
            .create_async()
            .await;

        let request = QueryRequest {
            text: "dog".to_string(),
            top_k: 1,
            filter: None,
        };

        let result = client_for(&server).query(&request).await;

        assert!(matches!(result, Err(SearchError::ApiError { status: 429, .. })));
    }

    async fn create_schema_drift_server() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query-data")
            .with_status(200)
            .with_body(
                json!({
                    "result": [{ "id": "Pug", "score": 0.9, "metadata": { "name": "Pug", "popularity": 32 } }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn test_query_unreadable_metadata_is_error() {
        let server = create_schema_drift_server().await;

        let request = QueryRequest {
            text: "dog".to_string(),
            top_k: 8,
            filter: None,
        };

        let result = client_for(&server).query(&request).await;

        match result {
            Err(SearchError::InvalidResponse(message)) => assert!(message.contains("Pug")),
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_matcher_aborts_on_unreadable_metadata() {
        use crate::core::{BreedMatcher, MatchError};
        use std::sync::Arc;

        let server = create_schema_drift_server().await;
        let matcher = BreedMatcher::with_default_settings(Arc::new(client_for(&server)));

        let result = matcher
            .find_best_match(&crate::models::PreferenceConstraints::new("small dog"))
            .await;

        assert!(matches!(result, Err(MatchError::Backend(SearchError::InvalidResponse(_)))));
    }

    #[tokio::test]
    async fn test_fetch_found_and_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/fetch")
            .match_body(Matcher::PartialJson(json!({ "ids": ["Beagle"] })))
            .with_status(200)
            .with_body(
                json!({
                    "result": [{ "id": "Beagle", "metadata": { "breed": "Beagle", "popularity": 7 } }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", "/fetch")
            .match_body(Matcher::PartialJson(json!({ "ids": ["Nope"] })))
            .with_status(200)
            .with_body(r#"{"result": [null]}"#)
            .create_async()
            .await;

        let client = client_for(&server);

        let beagle = client.fetch("Beagle").await.unwrap().unwrap();
        assert_eq!(beagle.breed, "Beagle");
        assert!(client.fetch("Nope").await.unwrap().is_none());
    }
}
