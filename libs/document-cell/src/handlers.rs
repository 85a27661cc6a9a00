// libs/document-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::{access, SharedStore};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::records::{AppointmentStatus, Patient};

use crate::services::{render_appointment_document, render_invoice_document, RenderError};

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        error!("Document rendering failed: {}", err);
        AppError::Internal(err.to_string())
    }
}

fn pdf_attachment(filename: String, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        bytes,
    )
        .into_response()
}

async fn patient(store: &SharedStore, patient_id: Uuid) -> Result<Patient, AppError> {
    store
        .get_patient(patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Patient {} not found", patient_id)))
}

#[axum::debug_handler]
pub async fn appointment_pdf(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let appointment = store
        .get_appointment(appointment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", appointment_id)))?;
    access::ensure_appointment_access(&store, &user, &appointment).await?;

    if !matches!(appointment.status, AppointmentStatus::Approved | AppointmentStatus::Discharged) {
        return Err(AppError::Conflict(format!(
            "Confirmation is only available once approved; appointment is {}",
            appointment.status
        )));
    }

    let doctor = store
        .get_doctor(appointment.doctor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Doctor {} not found", appointment.doctor_id)))?;
    let patient = patient(&store, appointment.patient_id).await?;

    let bytes = render_appointment_document(&appointment, &doctor, &patient)?;
    debug!("Rendered confirmation for appointment {} ({} bytes)", appointment_id, bytes.len());

    Ok(pdf_attachment(format!("appointment-{}.pdf", appointment.id), bytes))
}

#[axum::debug_handler]
pub async fn invoice_pdf(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let invoice = store
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))?;

    // The assigned doctor reaches the invoice through its appointment.
    let appointment = match invoice.appointment_id {
        Some(appointment_id) => store.get_appointment(appointment_id).await?,
        None => None,
    };
    match appointment {
        Some(appointment) => access::ensure_appointment_access(&store, &user, &appointment).await?,
        None => access::ensure_patient_access(&store, &user, invoice.patient_id).await?,
    }

    let patient = patient(&store, invoice.patient_id).await?;
    let bytes = render_invoice_document(&invoice, &patient)?;
    debug!("Rendered invoice {} ({} bytes)", invoice.invoice_number, bytes.len());

    Ok(pdf_attachment(format!("invoice-{}.pdf", invoice.invoice_number), bytes))
}
