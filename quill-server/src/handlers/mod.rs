//! Request handlers

mod export;
mod health;

pub use export::{export_docx, export_pdf};
pub use health::{health_check, HealthResponse};
