use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;
use crate::core::{BreedMatcher, MatchError};
use crate::models::{
    BreedProfile, BreedSearchRequest, BreedSearchResponse, HealthResponse, RecommendRequest,
    RecommendResponse, ScoredBreed,
};
use crate::routes::error_response;
use crate::services::{CatalogCache, ConstraintExtractor, DogImageClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<BreedMatcher>,
    pub extractor: Arc<dyn ConstraintExtractor>,
    pub images: Arc<DogImageClient>,
    pub catalog: Arc<CatalogCache>,
}

/// Configure recommendation and chat search routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/recommendations", web::post().to(recommend))
        .route("/search", web::post().to(search_breeds));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Recommend one breed from questionnaire answers
///
/// POST /api/v1/recommendations
///
/// Request body:
/// ```json
/// {
///   "questionnaireAnswers": [
///     { "question": { "id": "2", "text": "..." }, "answer": { "id": "1", "text": "..." } }
///   ]
/// }
/// ```
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> impl Responder {
    let request_id = uuid::Uuid::new_v4().to_string();

    // Validate request
    if let Err(errors) = req.validate() {
        tracing::info!(%request_id, "Validation failed for recommendation request: {}", errors);
        return error_response(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
            Some(&request_id),
        );
    }

    tracing::info!(
        %request_id,
        "Generating recommendation from {} answers",
        req.questionnaire_answers.len()
    );

    // Stage 1: answers -> constraints
    let constraints = match state.extractor.extract(&req.questionnaire_answers).await {
        Ok(constraints) => constraints,
        Err(e) if e.is_validation() => {
            tracing::info!(%request_id, "Rejected questionnaire: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "Validation failed",
                e.to_string(),
                Some(&request_id),
            );
        }
        Err(e) => {
            tracing::error!(%request_id, "Failed to extract constraints: {}", e);
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Failed to process questionnaire",
                e.to_string(),
                Some(&request_id),
            );
        }
    };

    tracing::debug!(%request_id, "Constraints: {:?}", constraints);

    // Stage 2: tiered search, selection and explanation
    match state.matcher.recommend(&constraints).await {
        Ok((recommendation, _)) => HttpResponse::Ok().json(RecommendResponse { recommendation }),
        Err(MatchError::NotFound) => {
            tracing::info!(%request_id, "No breed matched at any tier");
            error_response(
                StatusCode::NOT_FOUND,
                "No matching dog breeds found",
                "Try relaxing some of your answers",
                Some(&request_id),
            )
        }
        Err(e) => {
            tracing::error!(%request_id, "Breed search failed: {}", e);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Breed search unavailable",
                e.to_string(),
                Some(&request_id),
            )
        }
    }
}

/// Single-result breed search used as a chat tool
///
/// POST /api/v1/search
///
/// Request body: raw filter parameters plus an optional `topK`.
async fn search_breeds(
    state: web::Data<AppState>,
    req: web::Json<BreedSearchRequest>,
) -> impl Responder {
    let BreedSearchRequest { params, top_k } = req.into_inner();

    let constraints = match params.into_constraints() {
        Ok(constraints) => constraints,
        Err(e) => {
            tracing::info!("Rejected search parameters: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Validation failed", e.to_string(), None);
        }
    };

    match state.matcher.quick_search(&constraints, top_k).await {
        Ok(best) => {
            tracing::info!("Chat search matched {} at tier {}", best.hit.id, best.used_tier);
            HttpResponse::Ok().json(BreedSearchResponse {
                breeds: vec![ScoredBreed {
                    profile: BreedProfile::from(&best.hit.record),
                    score: best.hit.score,
                }],
                count: 1,
                message: None,
            })
        }
        Err(MatchError::NotFound) => HttpResponse::Ok().json(BreedSearchResponse {
            breeds: Vec::new(),
            count: 0,
            message: Some("No breeds found matching these criteria".to_string()),
        }),
        Err(e) => {
            tracing::error!("Chat search failed: {}", e);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Breed search unavailable",
                e.to_string(),
                None,
            )
        }
    }
}
