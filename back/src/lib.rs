pub mod error;
pub mod store;
pub mod v1;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::store::AppState;

/// Build the application router with the versioned API nested under
/// `/api/v1`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", v1::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
}
