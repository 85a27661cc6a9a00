// libs/appointment-cell/src/services/appointment.rs
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use billing_cell::{price_line_items, BillingService};
use notification_cell::NotificationRelay;
use shared_database::{AppointmentFilter, CasOutcome, SharedStore};
use shared_models::auth::{Actor, Role};
use shared_models::records::{Appointment, AppointmentStatus, DischargeRecord};

use crate::models::{
    AppointmentError, AppointmentView, BillingOutcome, DischargeDetails, DischargeOutcome,
    LifecycleAction, RequestAppointmentRequest, RetryHint,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Drives appointments through their lifecycle. Every status change is a
/// compare-and-set on the stored status, so concurrent callers cannot both win.
pub struct AppointmentService {
    store: SharedStore,
    relay: NotificationRelay,
    lifecycle: AppointmentLifecycleService,
    default_tax_rate: Decimal,
}

impl AppointmentService {
    pub fn new(store: SharedStore, relay: NotificationRelay, default_tax_rate: Decimal) -> Self {
        Self {
            store,
            relay,
            lifecycle: AppointmentLifecycleService::new(),
            default_tax_rate,
        }
    }

    pub async fn request_appointment(
        &self,
        actor: Actor,
        request: RequestAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let patient = match actor.role {
            Role::Patient => self
                .store
                .find_patient_by_user(actor.id)
                .await?
                .ok_or(AppointmentError::PatientNotFound)?,
            Role::Admin => {
                let patient_id = request.patient_id.ok_or_else(|| {
                    AppointmentError::ValidationError("patient_id is required when booking for a patient".to_string())
                })?;
                self.store
                    .get_patient(patient_id)
                    .await?
                    .ok_or(AppointmentError::PatientNotFound)?
            }
            Role::Doctor => {
                return Err(AppointmentError::ValidationError(
                    "Doctors cannot request appointments".to_string(),
                ));
            }
        };

        let doctor = self
            .store
            .get_doctor(request.doctor_id)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id: doctor.id,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            status: AppointmentStatus::Pending,
            description: request
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.save_appointment(appointment).await?;
        info!(
            "Appointment {} requested for patient {} with doctor {}",
            saved.id, saved.patient_id, saved.doctor_id
        );

        self.relay.announce(&saved).await;
        Ok(saved)
    }

    pub async fn approve(&self, appointment_id: Uuid, actor: Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, LifecycleAction::Approve).await
    }

    pub async fn reject(&self, appointment_id: Uuid, actor: Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, LifecycleAction::Reject).await
    }

    /// Approved -> Discharged, writes the discharge record and, when charges are
    /// supplied, issues the invoice. Input errors are rejected while the appointment
    /// is still Approved. A billing failure does not undo the discharge; it is
    /// reported in the outcome instead.
    pub async fn discharge(
        &self,
        appointment_id: Uuid,
        actor: Actor,
        details: DischargeDetails,
    ) -> Result<DischargeOutcome, AppointmentError> {
        let symptoms = details.symptoms.trim().to_string();
        if symptoms.is_empty() {
            return Err(AppointmentError::ValidationError("Discharge symptoms are required".to_string()));
        }

        let tax_rate = details.tax_rate.unwrap_or(self.default_tax_rate);
        if !details.charges.is_empty() {
            price_line_items(&details.charges, tax_rate)
                .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;
        }

        let (from, appointment) = self.commit(appointment_id, actor, LifecycleAction::Discharge).await?;

        let record = DischargeRecord {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            appointment_id: appointment.id,
            symptoms,
            discharge_date: details.discharge_date.unwrap_or_else(|| Utc::now().date_naive()),
            created_at: Utc::now(),
        };
        let discharge = match self.store.save_discharge(record).await {
            Ok(discharge) => discharge,
            Err(e) => {
                self.restore_status(&appointment, from).await;
                return Err(e.into());
            }
        };
        info!("Discharge record {} written for appointment {}", discharge.id, appointment.id);
        self.relay.announce(&appointment).await;

        let billing = if details.charges.is_empty() {
            BillingOutcome::NotRequested
        } else {
            match BillingService::new(self.store.clone())
                .generate_invoice(appointment.id, details.charges, tax_rate)
                .await
            {
                Ok(invoice) => BillingOutcome::Issued { invoice },
                Err(e) => {
                    warn!("Appointment {} discharged but invoicing failed: {}", appointment.id, e);
                    BillingOutcome::Failed {
                        reason: e.to_string(),
                        retry: RetryHint::generate_invoice(),
                    }
                }
            }
        };

        Ok(DischargeOutcome { appointment, discharge, billing })
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.store.list_appointments(filter).await?)
    }

    /// Approved appointments still waiting to be discharged, optionally for one doctor.
    pub async fn awaiting_discharge(&self, doctor_id: Option<Uuid>) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            doctor_id,
            status: Some(AppointmentStatus::Approved),
            ..AppointmentFilter::default()
        };
        self.list_appointments(&filter).await
    }

    pub async fn discharge_record(&self, appointment_id: Uuid) -> Result<Option<DischargeRecord>, AppointmentError> {
        Ok(self.store.find_discharge_by_appointment(appointment_id).await?)
    }

    pub fn view(&self, appointment: Appointment) -> AppointmentView {
        let allowed_actions = self.lifecycle.allowed_actions(appointment.status);
        AppointmentView { appointment, allowed_actions }
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        actor: Actor,
        action: LifecycleAction,
    ) -> Result<Appointment, AppointmentError> {
        let (_, updated) = self.commit(appointment_id, actor, action).await?;
        self.relay.announce(&updated).await;
        Ok(updated)
    }

    /// Applies the status change without announcing it. Returns the status it
    /// replaced alongside the updated appointment.
    async fn commit(
        &self,
        appointment_id: Uuid,
        actor: Actor,
        action: LifecycleAction,
    ) -> Result<(AppointmentStatus, Appointment), AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;
        let next = self.lifecycle.validate_transition(current.status, action, actor.role)?;

        let outcome = self
            .store
            .compare_and_set_appointment_status(appointment_id, current.status, next, Utc::now())
            .await?;

        match outcome {
            CasOutcome::Updated(updated) => {
                info!("Appointment {} {} -> {} by {} {}", updated.id, current.status, next, actor.role, actor.id);
                Ok((current.status, updated))
            }
            CasOutcome::Stale(latest) => {
                debug!("Appointment {} changed to {} before {} could apply", appointment_id, latest.status, action);
                Err(AppointmentError::InvalidTransition { from: latest.status, action })
            }
            CasOutcome::Missing => Err(AppointmentError::NotFound(appointment_id)),
        }
    }

    /// Puts a committed appointment back to `previous` after a follow-up write failed.
    async fn restore_status(&self, appointment: &Appointment, previous: AppointmentStatus) {
        match self
            .store
            .compare_and_set_appointment_status(appointment.id, appointment.status, previous, Utc::now())
            .await
        {
            Ok(CasOutcome::Updated(_)) => {
                warn!("Appointment {} returned to {}", appointment.id, previous);
            }
            Ok(_) => {
                error!("Appointment {} moved on before it could return to {}", appointment.id, previous);
            }
            Err(e) => {
                error!("Appointment {} stuck in {}: {}", appointment.id, appointment.status, e);
            }
        }
    }
}
