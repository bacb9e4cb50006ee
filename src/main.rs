use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use breed_match::config::{ExtractorProvider, LoggingSettings, Settings};
use breed_match::core::{BreedMatcher, MatcherSettings};
use breed_match::routes::{self, AppState};
use breed_match::services::{
    CatalogCache, ConstraintExtractor, DogImageClient, OpenAiExtractor, RuleBasedExtractor,
    UpstashClient,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.is_pretty() {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Logging comes from [logging]; environment variables take precedence
    let loaded = Settings::load();
    let logging = loaded
        .as_ref()
        .map(|settings| settings.logging.clone())
        .unwrap_or_default()
        .with_env_overrides(|name| std::env::var(name).ok());
    init_tracing(&logging);

    info!("Starting breed match service...");

    let settings = loaded.map_err(|e| startup_error("Configuration error", e))?;

    info!("Configuration loaded successfully");

    // Initialize search backend
    if settings.search.url.is_empty() || settings.search.token.is_empty() {
        return Err(startup_error(
            "Configuration error",
            "UPSTASH_VECTOR_REST_URL and UPSTASH_VECTOR_REST_TOKEN must be set",
        ));
    }

    let backend = UpstashClient::new(
        settings.search.url.clone(),
        settings.search.token.clone(),
        settings.search.timeout_secs,
    )
    .map_err(|e| startup_error("Failed to build search client", e))?;

    let matcher_settings = MatcherSettings::from(&settings.matching);
    info!(
        "Matcher initialized (caps: {:?}, topK: {}, quick topK: {})",
        matcher_settings.popularity_caps, matcher_settings.top_k, matcher_settings.quick_top_k
    );
    let matcher = Arc::new(BreedMatcher::new(Arc::new(backend), matcher_settings));

    // Initialize constraint extractor
    let extractor: Arc<dyn ConstraintExtractor> = match settings.extractor.effective_provider() {
        ExtractorProvider::OpenAi => {
            let api_key = settings
                .extractor
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| startup_error("Configuration error", "extractor.api_key is required for the openai provider"))?;
            let extractor = OpenAiExtractor::new(
                settings.extractor.api_base.clone(),
                api_key,
                settings.extractor.model.clone(),
                settings.extractor.timeout_secs,
            )
            .map_err(|e| startup_error("Failed to build extractor client", e))?;
            info!("Using OpenAI extractor ({})", settings.extractor.model);
            Arc::new(extractor)
        }
        ExtractorProvider::Rules => {
            info!("Using rule-based extractor");
            Arc::new(RuleBasedExtractor::new())
        }
    };

    // Initialize image client (lookups report NotConfigured without a key)
    let images = DogImageClient::new(
        settings.images.base_url.clone(),
        settings.images.api_key.clone(),
        settings.images.timeout_secs,
    )
    .map_err(|e| startup_error("Failed to build image client", e))?;

    let catalog = CatalogCache::new(settings.catalog.ttl_secs);
    info!("Catalog cache initialized (TTL: {}s)", settings.catalog.ttl_secs);

    // Build application state
    let app_state = AppState {
        matcher,
        extractor,
        images: Arc::new(images),
        catalog: Arc::new(catalog),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
