use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{CasOutcome, SharedStore, StoreError};
use shared_models::records::{AppointmentStatus, Invoice, InvoiceItem, InvoiceStatus};

use crate::models::{BillingError, LineItemInput, PaymentReceipt};
use crate::services::money::{InvoiceTotals, MAX_INVOICE_AMOUNT};

pub const INVOICE_PREFIX: &str = "INV-";

pub fn format_invoice_number(sequence: u64) -> String {
    format!("{}{:06}", INVOICE_PREFIX, sequence)
}

/// Issues invoices for discharged appointments and records payments.
pub struct BillingService {
    store: SharedStore,
}

impl BillingService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn generate_invoice(
        &self,
        appointment_id: Uuid,
        items: Vec<LineItemInput>,
        tax_rate: Decimal,
    ) -> Result<Invoice, BillingError> {
        debug!("Generating invoice for appointment {}", appointment_id);

        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or(BillingError::AppointmentNotFound(appointment_id))?;

        if appointment.status != AppointmentStatus::Discharged {
            warn!("Refusing to invoice appointment {} in status {}", appointment_id, appointment.status);
            return Err(BillingError::InvalidTransition { status: appointment.status });
        }

        if self.store.find_invoice_by_appointment(appointment_id).await?.is_some() {
            return Err(BillingError::DuplicateInvoice { appointment_id });
        }

        let totals = price_line_items(&items, tax_rate)?;

        let items: Vec<InvoiceItem> = items
            .into_iter()
            .map(|item| InvoiceItem {
                description: item.description.trim().to_string(),
                amount: item.amount,
            })
            .collect();

        let sequence = self.store.next_invoice_sequence().await?;
        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number: format_invoice_number(sequence),
            appointment_id: Some(appointment_id),
            patient_id: appointment.patient_id,
            items,
            subtotal: totals.subtotal,
            tax_rate,
            tax: totals.tax,
            total: totals.total,
            status: InvoiceStatus::Unpaid,
            created_at: Utc::now(),
            paid_at: None,
        };

        let saved = match self.store.save_invoice(invoice).await {
            Ok(saved) => saved,
            // Lost the race against a concurrent caller for the same appointment.
            Err(StoreError::UniqueViolation(detail)) => {
                if self.store.find_invoice_by_appointment(appointment_id).await?.is_some() {
                    warn!("Concurrent invoice for appointment {} rejected", appointment_id);
                    return Err(BillingError::DuplicateInvoice { appointment_id });
                }
                return Err(StoreError::UniqueViolation(detail).into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            "Issued invoice {} for appointment {} (total {})",
            saved.invoice_number, appointment_id, saved.total
        );
        Ok(saved)
    }

    /// Unpaid -> Paid. Paying an already paid invoice succeeds without touching it.
    pub async fn mark_paid(&self, invoice_id: Uuid) -> Result<PaymentReceipt, BillingError> {
        let outcome = self
            .store
            .compare_and_set_invoice_status(invoice_id, InvoiceStatus::Unpaid, InvoiceStatus::Paid, Utc::now())
            .await?;

        match outcome {
            CasOutcome::Updated(invoice) => {
                info!("Invoice {} marked paid", invoice.invoice_number);
                Ok(PaymentReceipt { invoice, newly_paid: true })
            }
            CasOutcome::Stale(invoice) => {
                debug!("Invoice {} was already {}", invoice.invoice_number, invoice.status);
                Ok(PaymentReceipt { invoice, newly_paid: false })
            }
            CasOutcome::Missing => Err(BillingError::InvoiceNotFound(invoice_id)),
        }
    }

    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Invoice, BillingError> {
        self.store
            .get_invoice(invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(invoice_id))
    }

    pub async fn invoice_for_appointment(&self, appointment_id: Uuid) -> Result<Option<Invoice>, BillingError> {
        Ok(self.store.find_invoice_by_appointment(appointment_id).await?)
    }

    pub async fn invoices_for_patient(&self, patient_id: Uuid) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.store.list_invoices_for_patient(patient_id).await?)
    }
}

pub fn validate_line_items(items: &[LineItemInput], tax_rate: Decimal) -> Result<(), BillingError> {
    if items.is_empty() {
        return Err(BillingError::ValidationError("An invoice needs at least one line item".to_string()));
    }

    for (index, item) in items.iter().enumerate() {
        if item.description.trim().is_empty() {
            return Err(BillingError::ValidationError(format!(
                "Line item {} has an empty description",
                index + 1
            )));
        }
        if item.amount < Decimal::ZERO {
            return Err(BillingError::ValidationError(format!(
                "Line item '{}' has a negative amount",
                item.description.trim()
            )));
        }
    }

    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
        return Err(BillingError::ValidationError(format!(
            "Tax rate {} must be between 0 and 1",
            tax_rate
        )));
    }

    Ok(())
}

/// Validates the items and computes their totals, rejecting sets whose totals
/// would not fit an invoice.
pub fn price_line_items(items: &[LineItemInput], tax_rate: Decimal) -> Result<InvoiceTotals, BillingError> {
    validate_line_items(items, tax_rate)?;
    InvoiceTotals::compute(items.iter().map(|item| &item.amount), tax_rate).ok_or_else(|| {
        BillingError::ValidationError(format!(
            "Invoice total exceeds the maximum of {}",
            MAX_INVOICE_AMOUNT
        ))
    })
}
