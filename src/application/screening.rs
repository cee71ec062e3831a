//! Screening service: encode, predict, classify, report.
//!
//! The service is built once from an already-loaded classifier. The feature
//! schema is read and validated at construction, so a model without a usable
//! schema never reaches the form.

use std::sync::Arc;

use crate::domain::{
    build_report_record, classify, encode, FeatureSchema, FeatureVector, PatientInput,
    PredictionResult, RiskClass, Screening,
};
use crate::ports::{ModelError, ModelGateway, RenderedReport, ReportRenderer};
use crate::VisionCareError;

/// Runs one patient through the screening pipeline.
pub struct ScreeningService<M, R>
where
    M: ModelGateway,
    R: ReportRenderer,
{
    model: Arc<M>,
    renderer: Arc<R>,
    schema: Arc<FeatureSchema>,
}

impl<M, R> ScreeningService<M, R>
where
    M: ModelGateway,
    R: ReportRenderer,
{
    /// Create the service and derive the feature schema from the model.
    ///
    /// # Errors
    /// Returns `SchemaUnavailable` if the model exposes no schema and
    /// `SchemaMismatch` if the schema cannot be aligned with the encoder.
    pub fn new(model: Arc<M>, renderer: Arc<R>) -> Result<Self, VisionCareError> {
        let names = model
            .feature_names()
            .map_err(|e| VisionCareError::SchemaUnavailable(e.to_string()))?;
        let schema = FeatureSchema::new(names)?;

        tracing::info!(
            "Feature schema ready: {} columns, {} zero-filled, {} dropped",
            schema.len(),
            schema.unmatched().len(),
            schema.dropped().len()
        );

        Ok(Self {
            model,
            renderer,
            schema: Arc::new(schema),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode `input` in the model's column order.
    #[must_use]
    pub fn encode(&self, input: &PatientInput) -> FeatureVector {
        encode(input, &self.schema)
    }

    /// Run the classifier on an encoded vector.
    ///
    /// # Errors
    /// Returns `Model` if the gateway fails or returns an out-of-range class
    /// or probability.
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, VisionCareError> {
        let class = self.model.predict(features)?;
        let probability = self.model.predict_probability(features)?;

        let predicted_class = RiskClass::from_index(class)
            .ok_or_else(|| ModelError::InvalidOutput(format!("unexpected class {class}")))?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ModelError::InvalidOutput(format!(
                "probability {probability} outside [0, 1]"
            ))
            .into());
        }

        Ok(PredictionResult::new(predicted_class, probability))
    }

    /// Screen one patient.
    ///
    /// # Errors
    /// Returns `Validation` for a non-finite HbA1c, or any prediction error.
    pub fn run_screening(&self, input: PatientInput) -> Result<Screening, VisionCareError> {
        if !input.hba1c.is_finite() {
            return Err(VisionCareError::Validation(
                "HbA1c must be a finite number".into(),
            ));
        }

        tracing::debug!("Encoding patient input...");
        let features = self.encode(&input);

        tracing::debug!("Running classifier...");
        let result = self.predict(&features)?;
        let assessment = classify(&result);
        let report = build_report_record(
            &input,
            &assessment.label,
            result.risk_probability,
            &assessment.recommendation,
        );

        tracing::info!(
            "Screening complete: class={}, confidence={:.2}%",
            result.predicted_class,
            result.confidence_percent()
        );

        Ok(Screening::new(input, result, assessment, report))
    }

    /// Render the report of a completed screening.
    ///
    /// # Errors
    /// Returns `Render` if the document cannot be written.
    pub fn render_report(&self, screening: &Screening) -> Result<RenderedReport, VisionCareError> {
        Ok(self.renderer.render(&screening.report)?)
    }
}
