//! HTTP API handlers for fabtrack-ot

pub mod analytics;
pub mod auth;
pub mod clients;
pub mod health;
pub mod orders;
pub mod progress;
pub mod steps;

pub use analytics::{step_analytics, step_timeline};
pub use auth::auth_middleware;
pub use clients::{create_client, delete_client, get_client, list_clients};
pub use health::health_routes;
pub use orders::{create_order, delete_order, get_order, list_orders};
pub use progress::{
    complete_step, complete_step_for_all_units, get_unit_progress, start_step,
    start_step_for_all_units,
};
pub use steps::list_steps;
