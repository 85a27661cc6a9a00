// libs/document-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Expects a `SharedStore` extension on the enclosing router.
pub fn document_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/appointments/{appointment_id}/pdf", get(handlers::appointment_pdf))
        .route("/invoices/{invoice_id}/pdf", get(handlers::invoice_pdf))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
