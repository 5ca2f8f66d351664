//! HTTP router assembly.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// - `GET /health`, `GET /version`: public
/// - `POST /v1/ocr/scan`: key presence checked by the handler, verification by the scan pipeline
/// - `POST /v1/admin/keys/generate`: admin token middleware
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let admin_routes = Router::new()
        .route(
            "/v1/admin/keys/generate",
            post(handlers::admin::generate_key),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/version", get(handlers::health::version))
        .route(
            "/v1/ocr/scan",
            post(handlers::scan::scan).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
