//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter, explain_llm::OpenAiExplainAdapter, question_llm::OpenAiQuestionAdapter,
        stripe::StripeAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        auth::{
            login_handler, logout_handler, profile_handler, signup_handler, upload_image_handler,
        },
        billing::{
            check_subscription_handler, free_tier_handler, subscription_info_handler,
            verify_payment_handler,
        },
        create_session_handler,
        generate::{generate_explanation_handler, generate_questions_handler},
        list_sessions_handler,
        middleware::require_auth,
        questions::{add_questions_handler, toggle_pin_handler, update_note_handler},
        rest::ApiDoc,
        sessions::{append_questions_handler, delete_session_handler, get_session_handler},
        state::AppState,
        usage::get_usage_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
    middleware as axum_middleware,
};
use interview_prep_core::ports::{PaymentService, UsageStore};
use interview_prep_core::usage::UsageLedger;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use axum::http::{Method, HeaderValue, header::{AUTHORIZATION, CONTENT_TYPE, ACCEPT}};

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
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let question_adapter = Arc::new(OpenAiQuestionAdapter::new(
        openai_client.clone(),
        config.question_model.clone(),
    ));
    let explain_adapter = Arc::new(OpenAiExplainAdapter::new(
        openai_client.clone(),
        config.explanation_model.clone(),
    ));

    let payments: Option<Arc<dyn PaymentService>> = match config.stripe_secret_key.clone() {
        Some(key) => Some(Arc::new(StripeAdapter::new(key))),
        None => {
            info!("STRIPE_SECRET_KEY not set; billing routes will answer 503");
            None
        }
    };

    // Make sure the upload directory exists before anything writes to it.
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // --- 4. Build the Shared AppState ---
    let usage_store: Arc<dyn UsageStore> = db_adapter.clone();
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        question_adapter,
        explain_adapter,
        payments,
        ledger: UsageLedger::new(usage_store.clone()),
        usage_store,
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/profile", get(profile_handler))
        .route("/auth/upload-image", post(upload_image_handler))
        .route(
            "/sessions",
            post(create_session_handler).get(list_sessions_handler),
        )
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/questions", put(append_questions_handler))
        .route("/questions/add-to-session", post(add_questions_handler))
        .route("/questions/{id}/pin", put(toggle_pin_handler))
        .route("/questions/{id}/note", put(update_note_handler))
        .route("/ai/generate-questions", post(generate_questions_handler))
        .route(
            "/ai/generate-explanation",
            post(generate_explanation_handler),
        )
        .route("/usage", get(get_usage_handler))
        .route("/billing/subscription-info", get(subscription_info_handler))
        .route("/billing/free-tier", post(free_tier_handler))
        .route("/billing/verify-payment", post(verify_payment_handler))
        .route(
            "/billing/check-subscription",
            get(check_subscription_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

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
