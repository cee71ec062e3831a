//! Domain layer: patient intake, feature encoding and risk reporting.
//!
//! Pure types and functions; no I/O.

mod diagnosis;
pub mod features;
mod patient;
mod report;

pub use diagnosis::{
    classify, PredictionResult, RiskAssessment, RiskClass, Screening, HIGH_RISK_LABEL,
    HIGH_RISK_RECOMMENDATION, LOW_RISK_LABEL, LOW_RISK_RECOMMENDATION,
};
pub use features::{encode, FeatureSchema, FeatureVector, SchemaError};
pub use patient::{
    limits, BlueLightExposure, OccupationType, PatientInput, SmokingStatus, TearProduction,
    VisionSharpness,
};
pub use report::{
    build_report_record, format_probability, ReportRecord, REPORT_FILENAME, REPORT_TITLE,
};
