use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{access, SharedStore};
use shared_models::auth::{Capability, User};
use shared_models::error::AppError;

use crate::models::GenerateInvoiceRequest;
use crate::services::BillingService;

#[axum::debug_handler]
pub async fn generate_invoice(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Json(request): Json<GenerateInvoiceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require(Capability::ManageBilling)?;

    let tax_rate = request.tax_rate.unwrap_or(config.default_tax_rate);
    let invoice = BillingService::new(store)
        .generate_invoice(request.appointment_id, request.items, tax_rate)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(invoice))))
}

#[axum::debug_handler]
pub async fn get_invoice(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let invoice = BillingService::new(store.clone()).get_invoice(invoice_id).await?;
    access::ensure_patient_access(&store, &user, invoice.patient_id).await?;

    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn pay_invoice(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require(Capability::ManageBilling)?;

    let receipt = BillingService::new(store).mark_paid(invoice_id).await?;
    Ok(Json(json!(receipt)))
}

#[axum::debug_handler]
pub async fn get_appointment_invoice(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Looking up invoice for appointment {}", appointment_id);

    let invoice = BillingService::new(store.clone())
        .invoice_for_appointment(appointment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {} has no invoice", appointment_id)))?;
    access::ensure_patient_access(&store, &user, invoice.patient_id).await?;

    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn get_patient_invoices(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    access::ensure_patient_access(&store, &user, patient_id).await?;

    let invoices = BillingService::new(store).invoices_for_patient(patient_id).await?;
    Ok(Json(json!({
        "invoices": invoices,
        "total": invoices.len()
    })))
}
