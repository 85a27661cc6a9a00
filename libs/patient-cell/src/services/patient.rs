use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_models::records::Patient;

use crate::models::{PatientError, RegisterPatientRequest};

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct PatientService {
    store: SharedStore,
}

impl PatientService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Creates the profile linked to `user_id`, or refreshes it in place when one
    /// already exists. The boolean is true for a fresh profile.
    pub async fn register(
        &self,
        user_id: Uuid,
        fallback_email: Option<&str>,
        request: RegisterPatientRequest,
    ) -> Result<(Patient, bool), PatientError> {
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(PatientError::ValidationError("First and last name are required".to_string()));
        }

        let email = non_blank(request.email)
            .or_else(|| fallback_email.map(str::to_string))
            .ok_or_else(|| PatientError::ValidationError("Email is required".to_string()))?;
        if !email.contains('@') {
            return Err(PatientError::ValidationError(format!("Invalid email address: {}", email)));
        }

        let existing = self.store.find_patient_by_user(user_id).await?;
        let created = existing.is_none();
        let (id, created_at) = match existing {
            Some(profile) => (profile.id, profile.created_at),
            None => (Uuid::new_v4(), Utc::now()),
        };

        let patient = self
            .store
            .save_patient(Patient {
                id,
                user_id,
                first_name,
                last_name,
                email,
                mobile: non_blank(request.mobile),
                address: non_blank(request.address),
                symptoms: non_blank(request.symptoms),
                created_at,
            })
            .await?;

        if created {
            info!("Registered patient {} for user {}", patient.id, user_id);
        } else {
            info!("Updated patient profile {}", patient.id);
        }
        Ok((patient, created))
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);
        self.store
            .get_patient(patient_id)
            .await?
            .ok_or(PatientError::NotFound(patient_id))
    }
}
