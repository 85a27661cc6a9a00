use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::{access, SharedStore};
use shared_models::auth::{Capability, Role, User};
use shared_models::error::AppError;

use crate::models::RegisterPatientRequest;
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn register_patient(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (user_id, fallback_email) = match user.role {
        Role::Patient => (user.id, user.email.as_deref()),
        _ => {
            user.require(Capability::ManageDirectory)?;
            let user_id = request
                .user_id
                .ok_or_else(|| AppError::ValidationError("user_id is required".to_string()))?;
            (user_id, None)
        }
    };

    let service = PatientService::new(store);
    let (patient, created) = service.register(user_id, fallback_email, request).await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn get_my_profile(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Value>, AppError> {
    let patient = access::linked_patient(&store, &user).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    access::ensure_patient_access(&store, &user, patient_id).await?;

    let patient = PatientService::new(store).get_patient(patient_id).await?;
    Ok(Json(json!(patient)))
}
