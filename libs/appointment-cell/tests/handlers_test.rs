use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Extension, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::appointment_routes;
use notification_cell::NotificationRelay;
use shared_database::{EntityStore, InMemoryStore, SharedStore};
use shared_models::records::{Doctor, Patient};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct Clinic {
    app: Router,
    doctor: Doctor,
    doctor_token: String,
    other_doctor_token: String,
    patient: Patient,
    patient_token: String,
    admin_token: String,
}

async fn clinic() -> Clinic {
    let config = TestConfig::default();
    let store: SharedStore = Arc::new(InMemoryStore::new());

    let doctor_user = TestUser::doctor("doc@example.com");
    let other_doctor_user = TestUser::doctor("other@example.com");
    let patient_user = TestUser::patient("pat@example.com");
    let doctor = store.save_doctor(doctor_user.doctor_record("Cardiology")).await.unwrap();
    store.save_doctor(other_doctor_user.doctor_record("Dermatology")).await.unwrap();
    let patient = store.save_patient(patient_user.patient_record()).await.unwrap();

    let app = appointment_routes(config.to_arc())
        .layer(Extension(store))
        .layer(Extension(NotificationRelay::new()));

    let token = |user: &TestUser| JwtTestUtils::create_test_token(user, &config.jwt_secret, None);
    Clinic {
        doctor_token: token(&doctor_user),
        other_doctor_token: token(&other_doctor_user),
        patient_token: token(&patient_user),
        admin_token: token(&TestUser::admin("admin@example.com")),
        app,
        doctor,
        patient,
    }
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn book(clinic: &Clinic) -> String {
    let response = clinic
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/",
            &clinic.patient_token,
            Some(json!({
                "doctor_id": clinic.doctor.id,
                "appointment_date": "2026-11-03",
                "appointment_time": "09:30:00",
                "description": "chest pain"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["allowed_actions"], json!(["approve", "reject"]));
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_patient_books_and_doctor_discharges_with_invoice() {
    let clinic = clinic().await;
    let id = book(&clinic).await;

    let approved = clinic
        .app
        .clone()
        .oneshot(request("POST", &format!("/{}/approve", id), &clinic.doctor_token, None))
        .await
        .unwrap();
    assert_eq!(approved.status(), StatusCode::OK);
    assert_eq!(json_body(approved).await["status"], "approved");

    let discharged = clinic
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/{}/discharge", id),
            &clinic.doctor_token,
            Some(json!({
                "symptoms": "fever",
                "charges": [{ "description": "consultation", "amount": "50.00" }]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(discharged.status(), StatusCode::OK);

    let outcome = json_body(discharged).await;
    assert_eq!(outcome["appointment"]["status"], "discharged");
    assert_eq!(outcome["discharge"]["symptoms"], "fever");
    assert_eq!(outcome["billing"]["status"], "issued");
    assert_eq!(outcome["billing"]["invoice"]["total"], "55.00");

    let record = clinic
        .app
        .oneshot(request("GET", &format!("/{}/discharge", id), &clinic.patient_token, None))
        .await
        .unwrap();
    assert_eq!(record.status(), StatusCode::OK);
    assert_eq!(json_body(record).await["patient_id"], clinic.patient.id.to_string());
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let clinic = clinic().await;
    let id = book(&clinic).await;

    let reject = clinic
        .app
        .clone()
        .oneshot(request("POST", &format!("/{}/reject", id), &clinic.admin_token, None))
        .await
        .unwrap();
    assert_eq!(reject.status(), StatusCode::OK);

    let approve = clinic
        .app
        .oneshot(request("POST", &format!("/{}/approve", id), &clinic.admin_token, None))
        .await
        .unwrap();
    assert_eq!(approve.status(), StatusCode::CONFLICT);
    assert!(json_body(approve).await["error"].as_str().unwrap().contains("rejected"));
}

#[tokio::test]
async fn test_patient_cannot_approve() {
    let clinic = clinic().await;
    let id = book(&clinic).await;

    let response = clinic
        .app
        .oneshot(request("POST", &format!("/{}/approve", id), &clinic.patient_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unassigned_doctor_cannot_review() {
    let clinic = clinic().await;
    let id = book(&clinic).await;

    let response = clinic
        .app
        .oneshot(request("POST", &format!("/{}/approve", id), &clinic.other_doctor_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_symptoms_is_bad_request() {
    let clinic = clinic().await;
    let id = book(&clinic).await;
    clinic
        .app
        .clone()
        .oneshot(request("POST", &format!("/{}/approve", id), &clinic.doctor_token, None))
        .await
        .unwrap();

    let response = clinic
        .app
        .oneshot(request("POST", &format!("/{}/discharge", id), &clinic.doctor_token, Some(json!({ "symptoms": "" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_appointment_is_not_found() {
    let clinic = clinic().await;

    let response = clinic
        .app
        .oneshot(request("POST", &format!("/{}/approve", Uuid::new_v4()), &clinic.admin_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let clinic = clinic().await;

    let response = clinic
        .app
        .oneshot(Request::builder().method("GET").uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_listings_are_scoped_by_role() {
    let clinic = clinic().await;
    let id = book(&clinic).await;

    let mine = clinic.app.clone().oneshot(request("GET", "/", &clinic.doctor_token, None)).await.unwrap();
    assert_eq!(json_body(mine).await["total"], 1);

    let theirs = clinic.app.clone().oneshot(request("GET", "/", &clinic.other_doctor_token, None)).await.unwrap();
    assert_eq!(json_body(theirs).await["total"], 0);

    let filtered = clinic
        .app
        .clone()
        .oneshot(request("GET", "/?status=approved", &clinic.admin_token, None))
        .await
        .unwrap();
    assert_eq!(json_body(filtered).await["total"], 0);

    clinic
        .app
        .clone()
        .oneshot(request("POST", &format!("/{}/approve", id), &clinic.doctor_token, None))
        .await
        .unwrap();

    let pending = clinic
        .app
        .clone()
        .oneshot(request("GET", "/discharge/pending", &clinic.admin_token, None))
        .await
        .unwrap();
    assert_eq!(json_body(pending).await["total"], 1);

    let forbidden = clinic
        .app
        .oneshot(request("GET", "/discharge/pending", &clinic.patient_token, None))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}
