//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        images::EMOTION_IMAGES_BUCKET, DbAdapter, FsImageStore, LocalStorageRoot,
        OpenWeatherAdapter,
    },
    config::Config,
    error::ApiError,
    session::SessionProvider,
    web::{
        auth::{guest_handler, login_handler, logout_handler, session_handler, signup_handler},
        calendar::calendar_handler,
        emotions::{
            add_custom_handler, delete_custom_handler, list_custom_handler, picker_handler,
            toggle_visibility_handler, visibility_handler,
        },
        entries::{capture_entry_handler, entry_detail_handler, list_entries_handler},
        require_session,
        rest::{refresh_handler, ApiDoc},
        weather::{current_weather_handler, report_location_handler},
        AppState, SessionRegistry,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Response, StatusCode,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Uploads are capped at 2MB by validation; the extra room lets oversized
/// images reach it and get the proper message.
const BODY_LIMIT_BYTES: usize = 3 * 1024 * 1024;

/// How often per-session state unused for a whole login lifetime is dropped.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Turns a panic in any handler into a body the client can offer a reload for.
fn recovery_response(panic: Box<dyn Any + Send + 'static>) -> Response<String> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    let body = serde_json::json!({
        "error": "予期しないエラーが発生しました。ページを再読み込みしてください。",
        "action": "reload",
    })
    .to_string();

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

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

    let images = Arc::new(FsImageStore::new(
        config.image_storage_path.clone(),
        EMOTION_IMAGES_BUCKET,
        &config.public_base_url,
    ));
    tokio::fs::create_dir_all(images.bucket_dir()).await?;

    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone(), images.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    tokio::fs::create_dir_all(&config.guest_storage_path).await?;
    let guest_storage = Arc::new(LocalStorageRoot::new(config.guest_storage_path.clone()));

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    if config.openweather_api_key.is_none() {
        info!("OPENWEATHER_API_KEY is not set; weather will use the fallback descriptor.");
    }
    let weather_adapter = Arc::new(OpenWeatherAdapter::new(
        http_client,
        config.weather_api_base.clone(),
        config.openweather_api_key.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        sessions: SessionProvider::new(db_adapter.clone(), db_adapter, guest_storage),
        weather_service: weather_adapter,
        registry: SessionRegistry::default(),
    });

    let sweep_state = app_state.clone();
    tokio::spawn(async move {
        let mut every = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            every.tick().await;
            let swept = sweep_state
                .registry
                .sweep_idle(Utc::now(), sweep_state.sessions.session_ttl())
                .await;
            if swept > 0 {
                info!("Dropped {} idle sessions", swept);
            }
        }
    });

    // --- 5. Configure CORS ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/guest", post(guest_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/session", get(session_handler));

    // Journal routes (remote or guest session required)
    let protected_routes = Router::new()
        .route("/entries", get(list_entries_handler).post(capture_entry_handler))
        .route("/entries/{id}", get(entry_detail_handler))
        .route("/calendar/{year}/{month}", get(calendar_handler))
        .route("/emotions", get(picker_handler))
        .route("/emotions/settings", get(visibility_handler))
        .route("/emotions/settings/{emotion}", put(toggle_visibility_handler))
        .route("/emotions/custom", get(list_custom_handler).post(add_custom_handler))
        .route("/emotions/custom/{id}", delete(delete_custom_handler))
        .route("/weather", get(current_weather_handler).post(report_location_handler))
        .route("/refresh", get(refresh_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with uploaded images and the Swagger UI.
    let app = Router::new()
        .merge(api_router)
        .nest_service(
            &format!("/storage/{}", EMOTION_IMAGES_BUCKET),
            ServeDir::new(images.bucket_dir()),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CatchPanicLayer::custom(recovery_response));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
