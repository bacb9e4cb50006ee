// Route exports
pub mod breeds;
pub mod recommendations;

pub use recommendations::AppState;

use actix_web::{http::StatusCode, web, HttpResponse};
use crate::models::ErrorResponse;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(recommendations::configure)
            .configure(breeds::configure),
    );
}

/// JSON error body with the given status
pub(crate) fn error_response(
    status: StatusCode,
    error: &str,
    message: impl Into<String>,
    request_id: Option<&str>,
) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
        request_id: request_id.map(str::to_string),
    })
}
