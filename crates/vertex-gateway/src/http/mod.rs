//! HTTP surface (axum)
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/generate` | single or batch generation |
//! | POST | `/analyze` | single or batch analysis |
//! | POST | `/workflow/execute` | run a workflow document |
//! | GET | `/status` | configuration flag |
//! | GET | `/health` | liveness |
//! | GET/POST | `/cache?operation=clear\|stats` | admin-gated cache management |
//! | GET | `/operations/:operationId` | batch progress |
//! | GET | `/metrics` | operational snapshot |
//! | GET | `/models` | model catalog |

mod error;
mod handlers;
mod ops;

use axum::routing::{get, post};
use axum::Router;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::gateway::Gateway;

pub use error::ApiError;
pub use ops::{CacheQuery, OperationView, ADMIN_KEY_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(handlers::generate))
        .route("/analyze", post(handlers::analyze))
        .route("/workflow/execute", post(handlers::execute_workflow))
        .route("/status", get(ops::status))
        .route("/health", get(ops::health))
        .route("/cache", get(ops::cache).post(ops::cache))
        .route("/operations/:operation_id", get(ops::operation))
        .route("/metrics", get(ops::metrics))
        .route("/models", get(ops::models))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
