//! Axum application setup
//!
//! Creates and configures the Axum application with routes and middleware.

use crate::{
    Result,
    config::Settings,
    origin::TrustPolicy,
    session::{self, ProviderSet, SessionRegistry},
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,
    /// Login flows, selected per request
    pub providers: ProviderSet,
    /// Open QR sessions
    pub registry: Arc<SessionRegistry>,
    /// Parsed trusted-origin list used by admission
    pub trust: Arc<TrustPolicy>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(settings: Settings, providers: ProviderSet, registry: Arc<SessionRegistry>) -> Self {
        let trust = Arc::new(settings.admission.trust_policy());
        Self {
            settings: Arc::new(settings),
            providers,
            registry,
            trust,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Create the main Axum application with the real provider clients
pub fn create_app(settings: Settings, registry: Arc<SessionRegistry>) -> Result<Router> {
    let providers = session::default_providers(&settings)?;
    Ok(create_app_with_providers(settings, providers, registry))
}

/// Create the application around the given providers
pub fn create_app_with_providers(
    settings: Settings,
    providers: ProviderSet,
    registry: Arc<SessionRegistry>,
) -> Router {
    router(AppState::new(settings, providers, registry))
}

/// Routes and middleware over prepared state
pub fn router(state: AppState) -> Router {
    use super::handlers;

    Router::new()
        .route("/api/qr", get(handlers::qr_stream))
        .route("/api/login-qr", get(handlers::qr_stream))
        .route("/api/convert", post(handlers::convert_cookie))
        .route("/api/convert-cookie", post(handlers::convert_cookie))
        .route("/ping", get(handlers::ping))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
