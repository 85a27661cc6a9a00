use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn billing_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::generate_invoice))
        .route("/{invoice_id}", get(handlers::get_invoice))
        .route("/{invoice_id}/pay", post(handlers::pay_invoice))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment_invoice))
        .route("/patients/{patient_id}", get(handlers::get_patient_invoices))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
