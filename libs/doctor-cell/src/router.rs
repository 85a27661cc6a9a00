use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Expects a `SharedStore` extension on the enclosing router.
pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Directory lookups are public so booking forms can list doctors.
    let public_routes = Router::new()
        .route("/", get(handlers::search_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
