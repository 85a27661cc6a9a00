pub mod money;
pub mod reconciliation;

pub use money::{round_currency, InvoiceTotals, MAX_INVOICE_AMOUNT};
pub use reconciliation::{format_invoice_number, price_line_items, validate_line_items, BillingService};
