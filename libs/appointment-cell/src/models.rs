// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use billing_cell::LineItemInput;
use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::records::{Appointment, AppointmentStatus, DischargeRecord, Invoice};

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Approve,
    Reject,
    Discharge,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Approve => write!(f, "approve"),
            LifecycleAction::Reject => write!(f, "reject"),
            LifecycleAction::Discharge => write!(f, "discharge"),
        }
    }
}

/// Appointment plus the actions its current status still allows.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub allowed_actions: Vec<LifecycleAction>,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAppointmentRequest {
    /// Required when an admin books on a patient's behalf; ignored for patients.
    pub patient_id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DischargeDetails {
    pub symptoms: String,
    /// Defaults to the current date.
    pub discharge_date: Option<NaiveDate>,
    /// When present, an invoice is issued right after the discharge.
    #[serde(default)]
    pub charges: Vec<LineItemInput>,
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// DISCHARGE OUTCOME
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryHint {
    pub method: String,
    pub path: String,
}

impl RetryHint {
    pub fn generate_invoice() -> Self {
        Self {
            method: "POST".to_string(),
            path: "/invoices".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BillingOutcome {
    NotRequested,
    Issued { invoice: Invoice },
    /// The discharge stands; the invoice can be generated again later.
    Failed { reason: String, retry: RetryHint },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DischargeOutcome {
    pub appointment: Appointment,
    pub discharge: DischargeRecord,
    pub billing: BillingOutcome,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Cannot {action} an appointment that is {from}")]
    InvalidTransition { from: AppointmentStatus, action: LifecycleAction },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_)
            | AppointmentError::PatientNotFound
            | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Store(store_err) => store_err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_outcome_wire_format() {
        let failed = serde_json::to_value(BillingOutcome::Failed {
            reason: "store unavailable".to_string(),
            retry: RetryHint::generate_invoice(),
        })
        .unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["retry"]["path"], "/invoices");

        let skipped = serde_json::to_value(BillingOutcome::NotRequested).unwrap();
        assert_eq!(skipped, serde_json::json!({ "status": "not_requested" }));
    }

    #[test]
    fn test_discharge_details_charges_default_empty() {
        let details: DischargeDetails = serde_json::from_str(r#"{"symptoms":"fever"}"#).unwrap();
        assert!(details.charges.is_empty());
        assert!(details.discharge_date.is_none());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AppointmentError::InvalidTransition {
            from: AppointmentStatus::Rejected,
            action: LifecycleAction::Approve,
        };
        assert_eq!(err.to_string(), "Cannot approve an appointment that is rejected");
    }
}
