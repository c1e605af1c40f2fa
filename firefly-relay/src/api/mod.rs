pub mod ingest;
pub mod overview;
pub mod subscribe;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};

use crate::mailbox::StatusMailbox;
use crate::registry::SubscriberRegistry;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub mailbox: Arc<StatusMailbox>,
    pub registry: SubscriberRegistry,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(mailbox: Arc<StatusMailbox>, registry: SubscriberRegistry) -> Self {
        Self {
            mailbox,
            registry,
            started_at: Instant::now(),
        }
    }
}

/// Create the full relay router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(overview::index))
        .route("/status", get(overview::liveness).post(ingest::report_status))
        .route("/data", post(ingest::passthrough_data))
        .route("/subscribe", get(subscribe::subscribe))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
}

// Unknown paths and unknown methods both answer 404, matching the upstream
// reporters' expectations.
async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 - Not Found")
}
