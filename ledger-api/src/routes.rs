//! API Routes

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::metrics::metrics_middleware;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let enable_cors = state.config.enable_cors;
    let max_body_size = state.config.max_body_size;

    let mut router = Router::new()
        .route("/health", get(health_check))
        // Orchestrated operations
        .route("/payment-intents", post(create_payment_intent))
        .route("/payments/confirm", post(confirm_payment))
        .route("/uploads/:upload_intent_id", put(upload_file))
        // Client document channel
        .route(
            "/documents/:collection/:key",
            get(get_document).put(put_document),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(middleware::from_fn_with_state(state.clone(), metrics_middleware))
        .with_state(state);

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.layer(TraceLayer::new_for_http())
}

/// Build the full application router
pub fn build_app(state: AppState) -> Router {
    create_router(Arc::new(state))
}
