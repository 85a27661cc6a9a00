pub mod services;
pub mod handlers;
pub mod router;

pub use services::*;
pub use router::document_routes;
