use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_models::records::Doctor;

use crate::models::{CreateDoctorRequest, DoctorError, DoctorSearchQuery};

pub struct DoctorService {
    store: SharedStore,
}

impl DoctorService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Creates or refreshes the profile linked to `request.user_id`. The boolean
    /// is true for a fresh profile.
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<(Doctor, bool), DoctorError> {
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        let department = request.department.trim().to_string();
        let email = request.email.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() {
            return Err(DoctorError::ValidationError("First and last name are required".to_string()));
        }
        if department.is_empty() {
            return Err(DoctorError::ValidationError("Department is required".to_string()));
        }
        if !email.contains('@') {
            return Err(DoctorError::ValidationError(format!("Invalid email address: {}", email)));
        }

        let existing = self.store.find_doctor_by_user(request.user_id).await?;
        let created = existing.is_none();
        let (id, created_at) = existing
            .map(|doctor| (doctor.id, doctor.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), Utc::now()));

        let doctor = self
            .store
            .save_doctor(Doctor {
                id,
                user_id: request.user_id,
                first_name,
                last_name,
                email,
                department,
                created_at,
            })
            .await?;

        info!("Saved doctor profile {} ({})", doctor.id, doctor.department);
        Ok((doctor, created))
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);
        self.store
            .get_doctor(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound(doctor_id))
    }

    /// Department match is case-insensitive.
    pub async fn search_doctors(&self, query: &DoctorSearchQuery) -> Result<Vec<Doctor>, DoctorError> {
        let doctors = self.store.list_doctors().await?;
        let department = query.department.as_deref().map(str::trim).filter(|d| !d.is_empty());

        Ok(match department {
            Some(department) => doctors
                .into_iter()
                .filter(|doctor| doctor.department.eq_ignore_ascii_case(department))
                .collect(),
            None => doctors,
        })
    }
}
