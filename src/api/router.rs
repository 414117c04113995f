//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Bodies are capped at the configured upload limit.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Base64 inflates uploads by 4/3; leave room for the JSON around them.
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_mul(4) / 3 + 64 * 1024
}

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let limit = body_limit(ctx.config.max_upload_bytes);

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/analyze", post(endpoints::analysis::analyze))
        .route("/compare", post(endpoints::analysis::compare))
        .route("/suggestions", post(endpoints::suggestions::suggestions))
        .route("/summary", post(endpoints::suggestions::summary))
        .route("/languages", get(endpoints::locale::languages))
        .route("/locales/:code", get(endpoints::locale::strings))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(limit))
        .layer(CorsLayer::permissive())
}
