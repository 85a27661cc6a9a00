use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::records::{
    Appointment, AppointmentStatus, DischargeRecord, Doctor, Invoice, InvoiceStatus, Patient,
};

use crate::store::{AppointmentFilter, CasOutcome, EntityStore, StoreError};

#[derive(Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    patients: HashMap<Uuid, Patient>,
    appointments: HashMap<Uuid, Appointment>,
    discharges: HashMap<Uuid, DischargeRecord>,
    discharge_by_appointment: HashMap<Uuid, Uuid>,
    invoices: HashMap<Uuid, Invoice>,
    invoice_by_appointment: HashMap<Uuid, Uuid>,
    invoice_numbers: HashSet<String>,
}

/// Process-local store. Every mutation runs under one write lock, which makes the
/// compare-and-set operations and the unique indexes atomic.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    invoice_sequence: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            invoice_sequence: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|row| key(row));
    rows
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn find_doctor_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.doctors.values().find(|d| d.user_id == user_id).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables.doctors.values().cloned().collect();
        Ok(sorted_by(rows, |d: &Doctor| (d.last_name.clone(), d.first_name.clone(), d.id)))
    }

    async fn save_doctor(&self, doctor: Doctor) -> Result<Doctor, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.doctors.values().any(|d| d.user_id == doctor.user_id && d.id != doctor.id) {
            return Err(StoreError::UniqueViolation(format!(
                "A doctor profile already exists for user {}",
                doctor.user_id
            )));
        }
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn find_patient_by_user(&self, user_id: Uuid) -> Result<Option<Patient>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.patients.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn save_patient(&self, patient: Patient) -> Result<Patient, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.patients.values().any(|p| p.user_id == patient.user_id && p.id != patient.id) {
            return Err(StoreError::UniqueViolation(format!(
                "A patient profile already exists for user {}",
                patient.user_id
            )));
        }
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn save_appointment(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.appointments.contains_key(&appointment.id) {
            return Err(StoreError::UniqueViolation(format!(
                "Appointment {} already exists",
                appointment.id
            )));
        }
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |a: &Appointment| (a.appointment_date, a.appointment_time, a.created_at, a.id)))
    }

    async fn compare_and_set_appointment_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome<Appointment>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(appointment) = tables.appointments.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };

        if appointment.status != expected {
            debug!("Appointment {} is {}, expected {}", id, appointment.status, expected);
            return Ok(CasOutcome::Stale(appointment.clone()));
        }

        appointment.status = next;
        appointment.updated_at = at;
        Ok(CasOutcome::Updated(appointment.clone()))
    }

    async fn save_discharge(&self, record: DischargeRecord) -> Result<DischargeRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.discharge_by_appointment.contains_key(&record.appointment_id) {
            return Err(StoreError::UniqueViolation(format!(
                "Appointment {} already has a discharge record",
                record.appointment_id
            )));
        }
        tables.discharge_by_appointment.insert(record.appointment_id, record.id);
        tables.discharges.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_discharge_by_appointment(&self, appointment_id: Uuid) -> Result<Option<DischargeRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .discharge_by_appointment
            .get(&appointment_id)
            .and_then(|id| tables.discharges.get(id))
            .cloned())
    }

    async fn next_invoice_sequence(&self) -> Result<u64, StoreError> {
        Ok(self.invoice_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn save_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        let mut tables = self.tables.write().await;

        if let Some(appointment_id) = invoice.appointment_id {
            if tables.invoice_by_appointment.contains_key(&appointment_id) {
                return Err(StoreError::UniqueViolation(format!(
                    "Appointment {} is already invoiced",
                    appointment_id
                )));
            }
        }
        if tables.invoice_numbers.contains(&invoice.invoice_number) {
            return Err(StoreError::UniqueViolation(format!(
                "Invoice number {} is already in use",
                invoice.invoice_number
            )));
        }

        if let Some(appointment_id) = invoice.appointment_id {
            tables.invoice_by_appointment.insert(appointment_id, invoice.id);
        }
        tables.invoice_numbers.insert(invoice.invoice_number.clone());
        tables.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        Ok(self.tables.read().await.invoices.get(&id).cloned())
    }

    async fn find_invoice_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Invoice>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .invoice_by_appointment
            .get(&appointment_id)
            .and_then(|id| tables.invoices.get(id))
            .cloned())
    }

    async fn list_invoices_for_patient(&self, patient_id: Uuid) -> Result<Vec<Invoice>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables
            .invoices
            .values()
            .filter(|i| i.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |i: &Invoice| (i.created_at, i.invoice_number.clone())))
    }

    async fn compare_and_set_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        next: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome<Invoice>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(invoice) = tables.invoices.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };

        if invoice.status != expected {
            return Ok(CasOutcome::Stale(invoice.clone()));
        }

        invoice.status = next;
        if next == InvoiceStatus::Paid {
            invoice.paid_at = Some(at);
        }
        Ok(CasOutcome::Updated(invoice.clone()))
    }
}
