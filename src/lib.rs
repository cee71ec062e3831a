//! # VisionCare
//!
//! Vision-risk screening: patient intake, feature encoding aligned to a
//! trained classifier, risk labelling and a PDF report.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Patient input, feature encoding, risk classification, report record
//! - `ports`: Traits for the classifier and the report renderer
//! - `adapters`: Random-forest loader, PDF writer, log redaction
//! - `application`: The screening pipeline
//! - `tui`: Terminal intake form

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{PatientInput, PredictionResult, RiskClass, Screening};

/// Result type for VisionCare operations
pub type Result<T> = std::result::Result<T, VisionCareError>;

/// Main error type for VisionCare
#[derive(Debug, thiserror::Error)]
pub enum VisionCareError {
    #[error("Model artifact could not be loaded: {0}")]
    ArtifactLoad(#[from] adapters::ArtifactError),

    #[error("Model feature schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("Model feature schema incompatible with the encoder: {0}")]
    SchemaMismatch(String),

    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Report rendering failed: {0}")]
    Render(#[from] ports::RenderError),

    #[error("Invalid patient data: {0}")]
    Validation(String),
}

impl From<domain::SchemaError> for VisionCareError {
    fn from(err: domain::SchemaError) -> Self {
        match err {
            domain::SchemaError::Empty => Self::SchemaUnavailable(err.to_string()),
            other => Self::SchemaMismatch(other.to_string()),
        }
    }
}
