use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Expects `SharedStore` and `NotificationRelay` extensions on the enclosing router.
pub fn notification_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/ws", get(handlers::connect))
        .route("/stats", get(handlers::relay_stats))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
