use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{CasOutcome, EntityStore, StoreError, SupabaseStore};
use shared_models::records::{Appointment, AppointmentStatus, Invoice, InvoiceItem, InvoiceStatus};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "anon-key".to_string(),
        supabase_service_role_key: "service-key".to_string(),
        supabase_jwt_secret: "secret".to_string(),
        ..AppConfig::default()
    }
}

fn appointment(status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        appointment_date: NaiveDate::from_ymd_opt(2026, 5, 11).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        status,
        description: Some("follow-up".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn invoice(appointment_id: Uuid) -> Invoice {
    Invoice {
        id: Uuid::new_v4(),
        invoice_number: "INV-000001".to_string(),
        appointment_id: Some(appointment_id),
        patient_id: Uuid::new_v4(),
        items: vec![InvoiceItem { description: "room".to_string(), amount: dec!(120.00) }],
        subtotal: dec!(120.00),
        tax_rate: dec!(0.10),
        tax: dec!(12.00),
        total: dec!(132.00),
        status: InvoiceStatus::Unpaid,
        created_at: Utc::now(),
        paid_at: None,
    }
}

#[tokio::test]
async fn test_requests_use_service_role_key() {
    let server = MockServer::start().await;
    let stored = appointment(AppointmentStatus::Pending);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", stored.id)))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let found = store.get_appointment(stored.id).await.unwrap();
    assert_eq!(found.map(|a| a.id), Some(stored.id));
}

#[tokio::test]
async fn test_status_swap_is_guarded_by_expected_status() {
    let server = MockServer::start().await;
    let mut updated = appointment(AppointmentStatus::Approved);
    updated.status = AppointmentStatus::Discharged;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", updated.id)))
        .and(query_param("status", "eq.approved"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let outcome = store
        .compare_and_set_appointment_status(
            updated.id,
            AppointmentStatus::Approved,
            AppointmentStatus::Discharged,
            Utc::now(),
        )
        .await
        .unwrap();

    assert_matches!(outcome, CasOutcome::Updated(a) if a.status == AppointmentStatus::Discharged);
}

#[tokio::test]
async fn test_unmatched_guard_reports_current_row() {
    let server = MockServer::start().await;
    let current = appointment(AppointmentStatus::Rejected);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let outcome = store
        .compare_and_set_appointment_status(
            current.id,
            AppointmentStatus::Pending,
            AppointmentStatus::Approved,
            Utc::now(),
        )
        .await
        .unwrap();

    assert_matches!(outcome, CasOutcome::Stale(a) if a.status == AppointmentStatus::Rejected);
}

#[tokio::test]
async fn test_unmatched_guard_on_unknown_row_is_missing() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let outcome = store
        .compare_and_set_invoice_status(Uuid::new_v4(), InvoiceStatus::Unpaid, InvoiceStatus::Paid, Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome, CasOutcome::Missing);
}

#[tokio::test]
async fn test_conflict_maps_to_unique_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"invoices_appointment_id_key\""
        })))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let result = store.save_invoice(invoice(Uuid::new_v4())).await;

    assert_matches!(result, Err(StoreError::UniqueViolation(_)));
}

#[tokio::test]
async fn test_server_errors_map_to_backend() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    assert_matches!(store.list_doctors().await, Err(StoreError::Backend(_)));
}

#[tokio::test]
async fn test_invoice_sequence_comes_from_rpc() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_invoice_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(42)))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    assert_eq!(store.next_invoice_sequence().await.unwrap(), 42);
}
