use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use document_cell::{render_appointment_document, render_invoice_document};
use shared_models::records::{
    Appointment, AppointmentStatus, Doctor, Invoice, InvoiceItem, InvoiceStatus, Patient,
};

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

fn doctor() -> Doctor {
    Doctor {
        id: Uuid::from_u128(1),
        user_id: Uuid::from_u128(2),
        first_name: "Gregory".to_string(),
        last_name: "House".to_string(),
        email: "house@example.com".to_string(),
        department: "Diagnostics".to_string(),
        created_at: fixed_time(),
    }
}

fn patient(first_name: &str) -> Patient {
    Patient {
        id: Uuid::from_u128(3),
        user_id: Uuid::from_u128(4),
        first_name: first_name.to_string(),
        last_name: "Doe".to_string(),
        email: "jane@example.com".to_string(),
        mobile: None,
        address: Some("12 Harbour Road".to_string()),
        symptoms: None,
        created_at: fixed_time(),
    }
}

fn appointment() -> Appointment {
    Appointment {
        id: Uuid::from_u128(5),
        patient_id: Uuid::from_u128(3),
        doctor_id: Uuid::from_u128(1),
        appointment_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
        status: AppointmentStatus::Approved,
        description: Some("follow-up".to_string()),
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

fn invoice(items: Vec<InvoiceItem>) -> Invoice {
    let subtotal: Decimal = items.iter().map(|item| item.amount).sum();
    let tax = (subtotal * dec!(0.10)).round_dp(2);
    Invoice {
        id: Uuid::from_u128(6),
        invoice_number: "INV-000042".to_string(),
        appointment_id: Some(Uuid::from_u128(5)),
        patient_id: Uuid::from_u128(3),
        items,
        subtotal,
        tax_rate: dec!(0.10),
        tax,
        total: subtotal + tax,
        status: InvoiceStatus::Unpaid,
        created_at: fixed_time(),
        paid_at: None,
    }
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle.as_bytes())
}

fn page_count(bytes: &[u8]) -> usize {
    let document = lopdf::Document::load_mem(bytes).unwrap();
    document.get_pages().len()
}

#[test]
fn test_appointment_document_is_deterministic() {
    let first = render_appointment_document(&appointment(), &doctor(), &patient("Jane")).unwrap();
    let second = render_appointment_document(&appointment(), &doctor(), &patient("Jane")).unwrap();

    assert!(first.starts_with(b"%PDF-1.5"));
    assert_eq!(first, second);
    assert_eq!(page_count(&first), 1);
}

#[test]
fn test_appointment_document_carries_confirmation_details() {
    let bytes = render_appointment_document(&appointment(), &doctor(), &patient("Jane")).unwrap();

    for expected in ["APPOINTMENT CONFIRMATION", "Dr. Gregory House", "Diagnostics", "2026-03-20", "14:30", "APPROVED"] {
        assert!(contains(&bytes, expected), "missing {}", expected);
    }
}

#[test]
fn test_invoice_document_lists_items_and_totals() {
    let bytes = render_invoice_document(
        &invoice(vec![
            InvoiceItem { description: "Consultation".to_string(), amount: dec!(50.00) },
            InvoiceItem { description: "Blood panel".to_string(), amount: dec!(19.99) },
        ]),
        &patient("Jane"),
    )
    .unwrap();

    assert!(bytes.starts_with(b"%PDF-1.5"));
    for expected in ["INV-000042", "Blood panel", "$69.99", "$7.00", "$76.99", "UNPAID"] {
        assert!(contains(&bytes, expected), "missing {}", expected);
    }
}

#[test]
fn test_long_invoice_spills_onto_more_pages() {
    let items = (0..150)
        .map(|i| InvoiceItem { description: format!("Dressing change {}", i), amount: dec!(2.50) })
        .collect();
    let bytes = render_invoice_document(&invoice(items), &patient("Jane")).unwrap();

    assert!(page_count(&bytes) > 1);
    assert!(contains(&bytes, "Page 1 of"));
}

#[test]
fn test_long_descriptions_wrap_beside_amounts() {
    let description = "Inpatient physiotherapy programme with daily mobilisation sessions and discharge exercise plan";
    let bytes = render_invoice_document(
        &invoice(vec![InvoiceItem { description: description.to_string(), amount: dec!(310.00) }]),
        &patient("Jane"),
    )
    .unwrap();

    assert!(!contains(&bytes, description));
    assert!(contains(&bytes, "Inpatient physiotherapy programme"));
    assert!(contains(&bytes, "discharge exercise plan"));
    assert!(contains(&bytes, "$310.00"));
}

#[test]
fn test_non_ascii_text_is_replaced() {
    let bytes = render_appointment_document(&appointment(), &doctor(), &patient("Zoë")).unwrap();

    assert!(contains(&bytes, "Zo? Doe"));
}
