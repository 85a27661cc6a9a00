use rust_decimal::Decimal;
use thiserror::Error;

use shared_models::records::{Appointment, Doctor, Invoice, Patient};

use crate::services::layout::{Font, PageLayout};

pub const HOSPITAL_NAME: &str = "HOSPITAL MANAGEMENT SYSTEM";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF encoding failed: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

fn header(layout: &mut PageLayout, title: &str) {
    layout.centered(Font::Bold, 20, HOSPITAL_NAME);
    layout.gap(6);
    layout.centered(Font::Bold, 16, title);
    layout.rule();
}

/// Confirmation slip for a booked appointment.
pub fn render_appointment_document(
    appointment: &Appointment,
    doctor: &Doctor,
    patient: &Patient,
) -> Result<Vec<u8>, RenderError> {
    let mut layout = PageLayout::new();
    header(&mut layout, "APPOINTMENT CONFIRMATION");

    layout.line(Font::Bold, 13, "Patient Information:");
    layout.line(Font::Regular, 11, &format!("Name: {}", patient.full_name()));
    layout.line(Font::Regular, 11, &format!("Email: {}", patient.email));
    layout.gap(10);

    layout.line(Font::Bold, 13, "Appointment Details:");
    layout.line(Font::Regular, 11, &format!("Appointment ID: {}", appointment.id));
    layout.line(Font::Regular, 11, &format!("Doctor: Dr. {}", doctor.full_name()));
    layout.line(Font::Regular, 11, &format!("Department: {}", doctor.department));
    layout.line(
        Font::Regular,
        11,
        &format!("Date: {}", appointment.appointment_date.format("%Y-%m-%d")),
    );
    layout.line(
        Font::Regular,
        11,
        &format!("Time: {}", appointment.appointment_time.format("%H:%M")),
    );
    layout.line(
        Font::Regular,
        11,
        &format!("Status: {}", appointment.status.to_string().to_uppercase()),
    );
    if let Some(notes) = appointment.description.as_deref().filter(|d| !d.trim().is_empty()) {
        layout.line(Font::Regular, 11, &format!("Notes: {}", notes));
    }

    layout.rule();
    layout.centered(Font::Regular, 10, "Please arrive 15 minutes before your appointment time.");

    layout.finish()
}

/// Itemised bill; pages break between line items when the list runs long.
pub fn render_invoice_document(invoice: &Invoice, patient: &Patient) -> Result<Vec<u8>, RenderError> {
    let mut layout = PageLayout::new();
    header(&mut layout, "INVOICE");

    layout.line(Font::Regular, 11, &format!("Invoice Number: {}", invoice.invoice_number));
    layout.line(
        Font::Regular,
        11,
        &format!("Date: {}", invoice.created_at.date_naive().format("%Y-%m-%d")),
    );
    layout.line(
        Font::Regular,
        11,
        &format!("Status: {}", invoice.status.to_string().to_uppercase()),
    );
    if let Some(paid_at) = invoice.paid_at {
        layout.line(Font::Regular, 11, &format!("Paid On: {}", paid_at.date_naive().format("%Y-%m-%d")));
    }
    layout.gap(10);

    layout.line(Font::Bold, 13, "Bill To:");
    layout.line(Font::Regular, 11, &patient.full_name());
    layout.line(Font::Regular, 11, &patient.email);
    if let Some(address) = patient.address.as_deref() {
        layout.line(Font::Regular, 11, address);
    }
    layout.gap(10);

    layout.columns(Font::Bold, 13, "Services:", "Amount");
    for item in &invoice.items {
        layout.columns(Font::Regular, 11, &item.description, &money(item.amount));
    }

    layout.rule();
    layout.columns(Font::Regular, 11, "Subtotal:", &money(invoice.subtotal));
    layout.columns(
        Font::Regular,
        11,
        &format!("Tax ({}%):", (invoice.tax_rate * Decimal::ONE_HUNDRED).normalize()),
        &money(invoice.tax),
    );
    layout.columns(Font::Bold, 13, "Total:", &money(invoice.total));

    layout.finish()
}
