use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use crate::core::MatchError;
use crate::models::{BreedListResponse, BreedProfile, BreedResponse, DogImageQuery, DogImageResponse};
use crate::routes::{error_response, AppState};
use crate::services::ImageError;

/// Configure breed lookup routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/breeds", web::get().to(list_breeds))
        .route("/breeds/{name}", web::get().to(get_breed))
        .route("/dog-image", web::get().to(dog_image));
}

/// All breed names in the index
///
/// GET /api/v1/breeds
async fn list_breeds(state: web::Data<AppState>) -> impl Responder {
    let names = state
        .catalog
        .breed_names(|| state.matcher.list_breed_names())
        .await;

    match names {
        Ok(names) if names.is_empty() => error_response(
            StatusCode::NOT_FOUND,
            "No breeds found",
            "The breed index returned no entries",
            None,
        ),
        Ok(names) => HttpResponse::Ok().json(BreedListResponse {
            count: names.len(),
            breeds: names.to_vec(),
        }),
        Err(e) => {
            tracing::error!("Failed to list breeds: {}", e);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Failed to fetch breeds",
                e.to_string(),
                None,
            )
        }
    }
}

/// One breed by name
///
/// GET /api/v1/breeds/{name}
async fn get_breed(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    let name = name.trim();

    if name.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing breed name",
            "A breed name is required",
            None,
        );
    }

    match state.matcher.fetch_breed(name).await {
        Ok(record) => HttpResponse::Ok().json(BreedResponse {
            breed: BreedProfile::from(&record),
        }),
        Err(MatchError::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            "Breed not found",
            format!("No breed named {}", name),
            None,
        ),
        Err(e) => {
            tracing::error!("Failed to fetch breed {}: {}", name, e);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Failed to fetch breed",
                e.to_string(),
                None,
            )
        }
    }
}

fn image_failure(status: StatusCode, error: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(DogImageResponse {
        success: false,
        url: None,
        error: Some(error.into()),
    })
}

/// Reference image for a breed
///
/// GET /api/v1/dog-image?breedName={name}
async fn dog_image(state: web::Data<AppState>, query: web::Query<DogImageQuery>) -> impl Responder {
    let Some(breed_name) = query
        .breed_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
    else {
        return image_failure(StatusCode::BAD_REQUEST, "Breed name is required");
    };

    match state.images.image_url(breed_name).await {
        Ok(url) => HttpResponse::Ok().json(DogImageResponse {
            success: true,
            url: Some(url),
            error: None,
        }),
        Err(e @ (ImageError::NotFound(_) | ImageError::NoImage)) => {
            tracing::debug!("No image for {}: {}", breed_name, e);
            image_failure(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => {
            tracing::error!("Image lookup failed for {}: {}", breed_name, e);
            image_failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
