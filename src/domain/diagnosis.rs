//! Prediction and risk-classification types.
//!
//! The classifier owns the decision boundary; this module only maps the
//! class it chose onto the text shown to the clinician.

use serde::{Deserialize, Serialize};

use super::patient::PatientInput;
use super::report::ReportRecord;

/// Label shown for the high-risk class.
pub const HIGH_RISK_LABEL: &str = "⚠️ High Risk of Vision Issue";

/// Label shown for the low-risk class.
pub const LOW_RISK_LABEL: &str = "✅ Low Risk";

/// Recommendation shown for the high-risk class.
pub const HIGH_RISK_RECOMMENDATION: &str =
    "🔴 Immediate consultation with an ophthalmologist recommended. Reduce screen time, track symptoms.";

/// Recommendation shown for the low-risk class.
pub const LOW_RISK_RECOMMENDATION: &str =
    "🟢 Maintain healthy vision habits and schedule annual checkups.";

/// Binary class predicted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskClass {
    /// Class 0
    Low,
    /// Class 1
    High,
}

impl RiskClass {
    /// Map a raw class index; anything but 0 or 1 is rejected.
    #[must_use]
    pub fn from_index(class: u8) -> Option<Self> {
        match class {
            0 => Some(Self::Low),
            1 => Some(Self::High),
            _ => None,
        }
    }

    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl std::fmt::Display for RiskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Output of one classifier call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_class: RiskClass,

    /// Probability of the high-risk class (0.0 to 1.0)
    pub risk_probability: f64,
}

impl PredictionResult {
    #[must_use]
    pub fn new(predicted_class: RiskClass, risk_probability: f64) -> Self {
        Self {
            predicted_class,
            risk_probability,
        }
    }

    /// Risk probability as a percentage (0.0 to 100.0).
    #[must_use]
    pub fn confidence_percent(&self) -> f64 {
        self.risk_probability * 100.0
    }
}

/// Display label and recommendation for a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub label: String,
    pub recommendation: String,
}

/// Derive the label and recommendation from the predicted class alone.
#[must_use]
pub fn classify(result: &PredictionResult) -> RiskAssessment {
    let (label, recommendation) = match result.predicted_class {
        RiskClass::High => (HIGH_RISK_LABEL, HIGH_RISK_RECOMMENDATION),
        RiskClass::Low => (LOW_RISK_LABEL, LOW_RISK_RECOMMENDATION),
    };
    RiskAssessment {
        label: label.to_string(),
        recommendation: recommendation.to_string(),
    }
}

/// One completed screening: input, prediction and report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screening {
    /// Unique identifier
    pub id: String,

    pub input: PatientInput,

    pub result: PredictionResult,

    pub assessment: RiskAssessment,

    /// Flattened record handed to the report renderer
    pub report: ReportRecord,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Screening {
    #[must_use]
    pub fn new(
        input: PatientInput,
        result: PredictionResult,
        assessment: RiskAssessment,
        report: ReportRecord,
    ) -> Self {
        Self {
            id: uuid_v4(),
            input,
            result,
            assessment,
            report,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Random UUID v4 from a ChaCha20 CSPRNG seeded by the OS.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let mut bytes: [u8; 16] = rng.gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
