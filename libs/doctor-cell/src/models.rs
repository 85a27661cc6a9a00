use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    /// Identity-provider account the profile is linked to.
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchQuery {
    pub department: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) => AppError::NotFound(err.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::Store(store_err) => store_err.into(),
        }
    }
}
