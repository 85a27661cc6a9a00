// Record-level visibility for the acting user, resolved through the directory.
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::records::{Appointment, Doctor, Patient};

use crate::store::SharedStore;

pub async fn linked_patient(store: &SharedStore, user: &User) -> Result<Patient, AppError> {
    store
        .find_patient_by_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No patient profile linked to this account".to_string()))
}

pub async fn linked_doctor(store: &SharedStore, user: &User) -> Result<Doctor, AppError> {
    store
        .find_doctor_by_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No doctor profile linked to this account".to_string()))
}

/// Admins see everything; patients see their own records.
pub async fn ensure_patient_access(store: &SharedStore, user: &User, patient_id: Uuid) -> Result<(), AppError> {
    let allowed = match user.role {
        Role::Admin => true,
        Role::Patient => linked_patient(store, user).await?.id == patient_id,
        Role::Doctor => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not allowed to access this patient's records".to_string()))
    }
}

/// Admins, the owning patient and the assigned doctor may see an appointment.
pub async fn ensure_appointment_access(store: &SharedStore, user: &User, appointment: &Appointment) -> Result<(), AppError> {
    let allowed = match user.role {
        Role::Admin => true,
        Role::Patient => linked_patient(store, user).await?.id == appointment.patient_id,
        Role::Doctor => linked_doctor(store, user).await?.id == appointment.doctor_id,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not allowed to access this appointment".to_string()))
    }
}

/// Doctors act only on appointments assigned to them; admins act on any.
pub async fn ensure_assigned(store: &SharedStore, user: &User, appointment: &Appointment) -> Result<(), AppError> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Doctor if linked_doctor(store, user).await?.id == appointment.doctor_id => Ok(()),
        _ => Err(AppError::Forbidden("Appointment is assigned to another doctor".to_string())),
    }
}
