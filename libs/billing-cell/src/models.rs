use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::records::{AppointmentStatus, Invoice};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemInput {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateInvoiceRequest {
    pub appointment_id: Uuid,
    pub items: Vec<LineItemInput>,
    /// Falls back to the configured default rate when absent.
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub invoice: Invoice,
    /// False when the invoice was already paid before this call.
    pub newly_paid: bool,
}

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(Uuid),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(Uuid),

    #[error("Cannot invoice an appointment that is {status}; it must be discharged first")]
    InvalidTransition { status: AppointmentStatus },

    #[error("Appointment {appointment_id} already has an invoice")]
    DuplicateInvoice { appointment_id: Uuid },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::AppointmentNotFound(_) | BillingError::InvoiceNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            BillingError::InvalidTransition { .. } | BillingError::DuplicateInvoice { .. } => {
                AppError::Conflict(err.to_string())
            }
            BillingError::ValidationError(msg) => AppError::ValidationError(msg),
            BillingError::Store(store_err) => store_err.into(),
        }
    }
}
