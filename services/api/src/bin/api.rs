//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::PgRecordStore, text_llm::OpenAiTextAdapter},
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::extract::DefaultBodyLimit;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use psico_core::{AiGateway, Orchestrator};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgRecordStore::new(db_pool));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the AI Gateway ---
    let gateway = match config.openai_api_key.as_ref() {
        Some(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            let text_adapter = Arc::new(OpenAiTextAdapter::new(
                openai_client,
                config.ai_model.clone(),
                config.ai_temperature,
            ));
            info!(model = %config.ai_model, timeout = ?config.ai_timeout, "AI gateway configured.");
            AiGateway::new(text_adapter, config.ai_timeout)
        }
        None => {
            warn!("OPENAI_API_KEY is not set; AI-assisted submissions will be refused.");
            AiGateway::unconfigured()
        }
    };
    if !config.fail_open_tasks.is_empty() {
        info!(tasks = ?config.fail_open_tasks, "Fail-open drafting enabled.");
    }

    // --- 4. Build the Shared AppState ---
    let orchestrator = Orchestrator::new(store, gateway, config.orchestrator_config());
    let app_state = Arc::new(AppState::new(orchestrator));

    // --- 5. Create the Web Router ---
    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(api_lib::web::middleware::PRACTITIONER_HEADER),
        ])
        .expose_headers([HeaderName::from_static(api_lib::web::rest::DEGRADED_HEADER)]);

    let app = router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
