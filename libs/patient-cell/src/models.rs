use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterPatientRequest {
    /// Required when an admin registers someone else; ignored for self-registration.
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    /// Falls back to the token's email.
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub symptoms: Option<String>,
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(_) => AppError::NotFound(err.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::Store(store_err) => store_err.into(),
        }
    }
}
