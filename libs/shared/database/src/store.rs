use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::records::{
    Appointment, AppointmentStatus, DischargeRecord, Doctor, Invoice, InvoiceStatus, Patient,
};

pub type SharedStore = Arc<dyn EntityStore>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => AppError::Conflict(msg),
            other => AppError::Database(other.to_string()),
        }
    }
}

/// Result of a conditional status update.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome<T> {
    /// The stored status matched and was replaced.
    Updated(T),
    /// The stored status did not match; carries the record as currently stored.
    Stale(T),
    /// No record with that id.
    Missing,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

/// Persistent records for the hospital workflow.
///
/// Implementations must make `compare_and_set_*` atomic per record and must reject
/// a second invoice for the same appointment (or a reused invoice number) with
/// [`StoreError::UniqueViolation`].
#[async_trait]
pub trait EntityStore: Send + Sync {
    // Directory
    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError>;
    async fn find_doctor_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>, StoreError>;
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError>;
    async fn save_doctor(&self, doctor: Doctor) -> Result<Doctor, StoreError>;

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError>;
    async fn find_patient_by_user(&self, user_id: Uuid) -> Result<Option<Patient>, StoreError>;
    async fn save_patient(&self, patient: Patient) -> Result<Patient, StoreError>;

    // Appointments
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;
    async fn save_appointment(&self, appointment: Appointment) -> Result<Appointment, StoreError>;
    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;
    async fn compare_and_set_appointment_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome<Appointment>, StoreError>;

    // Discharges
    async fn save_discharge(&self, record: DischargeRecord) -> Result<DischargeRecord, StoreError>;
    async fn find_discharge_by_appointment(&self, appointment_id: Uuid) -> Result<Option<DischargeRecord>, StoreError>;

    // Invoices
    async fn next_invoice_sequence(&self) -> Result<u64, StoreError>;
    async fn save_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError>;
    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, StoreError>;
    async fn find_invoice_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Invoice>, StoreError>;
    async fn list_invoices_for_patient(&self, patient_id: Uuid) -> Result<Vec<Invoice>, StoreError>;
    async fn compare_and_set_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        next: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome<Invoice>, StoreError>;
}
