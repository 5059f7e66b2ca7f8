//! Tokengate - shared-secret login with stateless signed sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Login / logout / dashboard pages                         │
//! │  - Prometheus metrics (admin sessions only)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Auth Layer                              │
//! │  - Credential verification (PBKDF2)                         │
//! │  - Session token codec (HS256 JWT)                          │
//! │  - Session extraction (cookie / query)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx), `secret_tokens` table                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTML pages and the metrics endpoint
//! - `auth`: Credential verification, sessions, login/logout
//! - `data`: Database and credential store
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Built once at startup and cloned into each request. Holds no per-session
/// state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Session token issuer/validator
    pub sessions: Arc<auth::SessionCodec>,

    /// Shared-secret matcher
    pub verifier: Arc<auth::CredentialVerifier>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Seed the credential store if it is empty
    /// 3. Build the session codec and credential verifier
    ///
    /// # Errors
    /// Returns `AppError::Config` when the configuration is invalid, or any
    /// database error raised during startup
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        config.validate()?;

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        // 2. Seed credential store
        Self::ensure_bootstrap_credential(&db, &config).await?;

        // 3. Session codec and verifier
        let sessions = auth::SessionCodec::new(
            &config.auth.signing_secret,
            config.auth.session_max_age,
        );
        let rounds = config.auth.hash_rounds;
        let verifier = tokio::task::spawn_blocking(move || auth::CredentialVerifier::new(rounds))
            .await
            .map_err(|e| error::AppError::Internal(e.into()))?
            .map_err(|e| error::AppError::Encryption(e.to_string()))?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            sessions: Arc::new(sessions),
            verifier: Arc::new(verifier),
        })
    }

    /// Ensure the configured shared secret is stored when no credential exists
    ///
    /// A populated store is left untouched, so restarts are no-ops.
    async fn ensure_bootstrap_credential(
        db: &data::Database,
        config: &config::AppConfig,
    ) -> Result<(), error::AppError> {
        let outcome = db
            .bootstrap_credential(
                &config.auth.shared_secret,
                config.auth.shared_secret_description.trim(),
                config.auth.hash_rounds,
            )
            .await?;

        let count = db.count_credentials().await?;
        metrics::CREDENTIALS_TOTAL.set(count);

        tracing::info!(?outcome, credentials = count, "Credential store ready");
        Ok(())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
    use tower_http::trace::TraceLayer;

    const MAX_BODY_BYTES: usize = 16 * 1024;

    let metrics_routes = api::metrics_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_admin,
    ));

    Router::new()
        .route("/", get(api::landing))
        .merge(auth::auth_router())
        .merge(metrics_routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> error::AppError {
    error::AppError::NotFound
}
