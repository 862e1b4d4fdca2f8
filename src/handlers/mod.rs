mod filter;
mod service_info;

pub use filter::post_filter;
pub use service_info::service_info;

use crate::filter::FilterOptions;
use crate::storage::Storage;
use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub options: FilterOptions,
    pub max_payload: usize,
}

/// Build the service router.
pub fn create_router(state: AppState) -> Router {
    let max_payload = state.max_payload;
    Router::new()
        .route("/filter/:id", post(post_filter))
        .route("/", get(service_info))
        .route("/service-info", get(service_info))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_payload))
        .layer(TraceLayer::new_for_http())
}
