mod detections;
mod health;
mod metrics;

pub use detections::get_detections;
pub use health::health_check;
pub use metrics::metrics_handler;

use crate::server::SharedState;
use axum::{routing::get, Router};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/detections", get(get_detections))
        .route("/health_check", get(health_check))
        .route("/metrics", get(metrics_handler))
}
