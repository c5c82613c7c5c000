use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use super::{feed, handlers, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Cached thumbnails, addressed by cache key
    let images = ServeDir::new(state.image_dir());

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Feed
        .route("/feed", get(feed::get_feed))
        .route("/feed/status", get(feed::get_status))
        .route("/feed/photos/{id}", get(feed::get_photo))
        .route("/feed/search", post(feed::search))
        .route("/feed/search/input", post(feed::search_input))
        .route("/feed/next-page", post(feed::next_page))
        .route("/feed/reset", post(feed::reset))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws", get(ws::ws_handler))
        .route("/metrics", get(handlers::metrics))
        .nest_service("/images", images)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
