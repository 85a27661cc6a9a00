use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::SharedStore;
use shared_models::auth::{Capability, User};
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, DoctorSearchQuery};
use crate::services::DoctorService;

// ==============================================================================
// PUBLIC DIRECTORY
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    Extension(store): Extension<SharedStore>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorService::new(store).search_doctors(&query).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    Extension(store): Extension<SharedStore>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(store).get_doctor(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

// ==============================================================================
// DIRECTORY MANAGEMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require(Capability::ManageDirectory)?;

    let (doctor, created) = DoctorService::new(store).create_doctor(request).await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!(doctor))))
}
