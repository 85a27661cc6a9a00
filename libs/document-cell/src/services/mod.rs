pub mod layout;
pub mod render;

pub use render::{render_appointment_document, render_invoice_document, RenderError};
