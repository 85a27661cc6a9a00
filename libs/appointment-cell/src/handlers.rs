// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use notification_cell::NotificationRelay;
use shared_config::AppConfig;
use shared_database::{access, AppointmentFilter, SharedStore};
use shared_models::auth::{Capability, Role, User};
use shared_models::error::AppError;

use crate::models::{AppointmentListQuery, DischargeDetails, RequestAppointmentRequest};
use crate::services::AppointmentService;

fn service(config: &AppConfig, store: SharedStore, relay: NotificationRelay) -> AppointmentService {
    AppointmentService::new(store, relay, config.default_tax_rate)
}

// ==============================================================================
// BOOKING & QUERIES
// ==============================================================================

#[axum::debug_handler]
pub async fn request_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    Json(request): Json<RequestAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let actor = user.require(Capability::RequestAppointment)?;

    let service = service(&config, store, relay);
    let appointment = service.request_appointment(actor, request).await?;

    Ok((StatusCode::CREATED, Json(json!(service.view(appointment)))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let mut filter = AppointmentFilter {
        status: query.status,
        ..AppointmentFilter::default()
    };
    match user.role {
        Role::Admin => {}
        Role::Doctor => filter.doctor_id = Some(access::linked_doctor(&store, &user).await?.id),
        Role::Patient => filter.patient_id = Some(access::linked_patient(&store, &user).await?.id),
    }

    let service = service(&config, store, relay);
    let appointments: Vec<_> = service
        .list_appointments(&filter)
        .await?
        .into_iter()
        .map(|appointment| service.view(appointment))
        .collect();

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = service(&config, store.clone(), relay);
    let appointment = service.get_appointment(appointment_id).await?;
    access::ensure_appointment_access(&store, &user, &appointment).await?;

    Ok(Json(json!(service.view(appointment))))
}

#[axum::debug_handler]
pub async fn pending_discharges(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
) -> Result<Json<Value>, AppError> {
    user.require(Capability::DischargePatient)?;

    let doctor_id = match user.role {
        Role::Doctor => Some(access::linked_doctor(&store, &user).await?.id),
        _ => None,
    };

    let appointments = service(&config, store, relay).awaiting_discharge(doctor_id).await?;
    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

// ==============================================================================
// LIFECYCLE ACTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn approve_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = user.require(Capability::ReviewAppointment)?;

    let service = service(&config, store.clone(), relay);
    let appointment = service.get_appointment(appointment_id).await?;
    access::ensure_assigned(&store, &user, &appointment).await?;

    let approved = service.approve(appointment_id, actor).await?;
    Ok(Json(json!(service.view(approved))))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = user.require(Capability::ReviewAppointment)?;

    let service = service(&config, store.clone(), relay);
    let appointment = service.get_appointment(appointment_id).await?;
    access::ensure_assigned(&store, &user, &appointment).await?;

    let rejected = service.reject(appointment_id, actor).await?;
    Ok(Json(json!(service.view(rejected))))
}

#[axum::debug_handler]
pub async fn discharge_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    Path(appointment_id): Path<Uuid>,
    Json(details): Json<DischargeDetails>,
) -> Result<Json<Value>, AppError> {
    let actor = user.require(Capability::DischargePatient)?;

    let service = service(&config, store.clone(), relay);
    let appointment = service.get_appointment(appointment_id).await?;
    access::ensure_assigned(&store, &user, &appointment).await?;

    let outcome = service.discharge(appointment_id, actor, details).await?;
    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn get_discharge_record(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Fetching discharge record for appointment {}", appointment_id);

    let service = service(&config, store.clone(), relay);
    let appointment = service.get_appointment(appointment_id).await?;
    access::ensure_appointment_access(&store, &user, &appointment).await?;

    let record = service
        .discharge_record(appointment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {} has not been discharged", appointment_id)))?;

    Ok(Json(json!(record)))
}
