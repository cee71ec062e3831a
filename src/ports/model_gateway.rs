//! Model gateway port: the trained classifier behind a narrow trait.
//!
//! Implementations are loaded once at startup and shared read-only
//! (`Arc<impl ModelGateway>`) for the lifetime of the process.

use crate::domain::FeatureVector;

/// Errors raised by a classifier at request time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("feature schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("model not loaded")]
    NotLoaded,

    #[error("feature vector is not aligned with the model schema: {0}")]
    Misaligned(String),

    #[error("model produced an invalid output: {0}")]
    InvalidOutput(String),
}

/// Trait for a binary risk classifier.
///
/// The classifier owns its decision rule: `predict` is authoritative and the
/// caller never re-thresholds `predict_probability`.
pub trait ModelGateway: Send + Sync {
    /// Ordered feature names the model was trained with.
    ///
    /// # Errors
    /// Returns `ModelError::SchemaUnavailable` if the model cannot report them.
    fn feature_names(&self) -> Result<Vec<String>, ModelError>;

    /// Predicted class, 0 (low risk) or 1 (high risk).
    ///
    /// # Errors
    /// Returns `ModelError` if the vector does not match the schema.
    fn predict(&self, features: &FeatureVector) -> Result<u8, ModelError>;

    /// Probability of class 1, in [0, 1].
    ///
    /// # Errors
    /// Returns `ModelError` if the vector does not match the schema.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}
