//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Navigation
        .route("/api/navigation", get(handlers::list_navigation))
        .route("/api/navigation/scrape", post(handlers::scrape_navigation))
        .route("/api/navigation/:slug", get(handlers::navigation_by_slug))
        // Categories
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/categories/:slug", get(handlers::category_by_slug))
        .route("/api/categories/:slug/scrape", post(handlers::scrape_category))
        .route(
            "/api/categories/:slug/products/scrape",
            post(handlers::scrape_category_products),
        )
        // Products
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/:id", get(handlers::product_by_id))
        .route("/api/products/:id/scrape", post(handlers::scrape_product))
        // Audit and history
        .route("/api/jobs", get(handlers::list_jobs))
        .route(
            "/api/history",
            get(handlers::list_history).post(handlers::record_history),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
