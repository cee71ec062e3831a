//! Adapters layer: concrete implementations of ports.
//!
//! - `forest`: random-forest classifier loaded from a (signed) JSON export
//! - `pdf`: PDF report writer
//! - `sanitize`: redaction of patient data from logs

pub mod forest;
pub mod pdf;
pub mod sanitize;

pub use forest::{ArtifactError, ArtifactPolicy, RandomForestAdapter};
pub use pdf::PdfReportRenderer;
