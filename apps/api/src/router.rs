use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::get,
};

use appointment_cell::appointment_routes;
use auth_cell::auth_routes;
use billing_cell::billing_routes;
use doctor_cell::doctor_routes;
use document_cell::document_routes;
use notification_cell::{notification_routes, NotificationRelay};
use patient_cell::patient_routes;
use shared_config::AppConfig;
use shared_database::SharedStore;

/// Every cell, with the store and relay handed down as request extensions.
pub fn create_router(state: Arc<AppConfig>, store: SharedStore, relay: NotificationRelay) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital Management API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/invoices", billing_routes(state.clone()))
        .nest("/documents", document_routes(state.clone()))
        .nest("/notifications", notification_routes(state))
        .layer(Extension(store))
        .layer(Extension(relay))
}
