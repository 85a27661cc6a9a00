// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Expects `SharedStore` and `NotificationRelay` extensions on the enclosing router.
pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::request_appointment).get(handlers::list_appointments))
        .route("/discharge/pending", get(handlers::pending_discharges))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/approve", post(handlers::approve_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .route(
            "/{appointment_id}/discharge",
            post(handlers::discharge_appointment).get(handlers::get_discharge_record),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
