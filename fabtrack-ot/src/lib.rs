//! fabtrack-ot library - Order Tracking service
//!
//! Tracks manufacturing orders from intake through assembly: clients place
//! orders, orders decompose into items, and every physical unit of an item
//! moves through the fixed assembly sequence one step at a time. Unit state
//! is projected on read from an append-only progress log.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Shared secret for API authentication
    pub shared_secret: i64,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, shared_secret: i64) -> Self {
        Self { db, shared_secret }
    }
}

/// Build application router
///
/// Step transitions mutate the progress log and require authentication;
/// catalog, CRUD, projection, and analytics reads are public, as is /health.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/progress/start", post(api::start_step))
        .route("/api/progress/complete", post(api::complete_step))
        .route(
            "/api/orders/:id/steps/:step_id/start-all",
            post(api::start_step_for_all_units),
        )
        .route(
            "/api/orders/:id/steps/:step_id/complete-all",
            post(api::complete_step_for_all_units),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/steps", get(api::list_steps))
        .route(
            "/api/clients",
            get(api::list_clients).post(api::create_client),
        )
        .route(
            "/api/clients/:id",
            get(api::get_client).delete(api::delete_client),
        )
        .route("/api/orders", get(api::list_orders).post(api::create_order))
        .route(
            "/api/orders/:id",
            get(api::get_order).delete(api::delete_order),
        )
        .route("/api/order-items/:id/progress", get(api::get_unit_progress))
        .route("/api/analytics/steps", get(api::step_analytics))
        .route("/api/analytics/steps/:id/timeline", get(api::step_timeline))
        .merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
