//! Flattened, display-ordered report record.

use serde::{Deserialize, Serialize};

use super::patient::PatientInput;

/// Title printed at the top of every report.
pub const REPORT_TITLE: &str = "VisionCare AI Report";

/// File name offered for download.
pub const REPORT_FILENAME: &str = "VisionCare_Report.pdf";

/// Ordered `label -> value` pairs, ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    entries: Vec<(String, String)>,
}

impl ReportRecord {
    /// Build a record from already formatted pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    fn push(&mut self, label: &str, value: impl Into<String>) {
        self.entries.push((label.to_string(), value.into()));
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries formatted as `"<label>: <value>"`.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|(l, v)| format!("{l}: {v}"))
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Format a probability in [0, 1] as a percentage with two decimals.
///
/// Rounds the exact binary value half-to-even, e.g. 0.5049999 -> "50.50%".
#[must_use]
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Flatten the patient input and the outcome into a report record.
#[must_use]
pub fn build_report_record(
    input: &PatientInput,
    label: &str,
    probability: f64,
    recommendation: &str,
) -> ReportRecord {
    let mut record = ReportRecord::default();

    record.push("Age", input.age.to_string());
    record.push("Diabetes", yes_no(input.diabetes));
    record.push("Blood Pressure", format!("{} mm Hg", input.blood_pressure));
    record.push("Screen Time", format!("{} hrs", input.screen_time));
    record.push("Cholesterol", format!("{} mg/dL", input.cholesterol));
    // Debug keeps one decimal on whole numbers ("7.0%").
    record.push("HbA1c", format!("{:?}%", input.hba1c));
    record.push("Blurred Vision", yes_no(input.blurred_vision));
    record.push("Eye Pain", yes_no(input.eye_pain));
    record.push("Family History", yes_no(input.family_history));
    record.push("Night Vision Difficulty", yes_no(input.night_vision_difficulty));
    record.push("Frequent Headaches", yes_no(input.headache));
    record.push("Smoking", input.smoking_status.as_str());
    record.push("Tear Production", input.tear_production.as_str());
    record.push("Wears Glasses", yes_no(input.wears_glasses));
    record.push("Vision Sharpness", input.vision_sharpness.as_str());
    record.push("Occupation Type", input.occupation_type.as_str());
    record.push("Blue Light Exposure", input.blue_light_exposure.as_str());
    record.push("Prediction", label);
    record.push("Confidence", format_probability(probability));
    record.push("Recommendation", recommendation);

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::{SmokingStatus, VisionSharpness};

    #[test]
    fn test_probability_rounding() {
        assert_eq!(format_probability(0.5049999), "50.50%");
        assert_eq!(format_probability(0.51), "51.00%");
        assert_eq!(format_probability(0.99), "99.00%");
        assert_eq!(format_probability(0.0), "0.00%");
        assert_eq!(format_probability(1.0), "100.00%");
        assert_eq!(format_probability(0.123456), "12.35%");
    }

    #[test]
    fn test_record_order_and_units() {
        let input = PatientInput {
            smoking_status: SmokingStatus::Former,
            vision_sharpness: VisionSharpness::Poor,
            ..PatientInput::default()
        };
        let record = build_report_record(&input, "✅ Low Risk", 0.25, "Keep it up");

        let labels: Vec<&str> = record.entries().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels.first(), Some(&"Age"));
        assert_eq!(&labels[labels.len() - 3..], &["Prediction", "Confidence", "Recommendation"]);
        assert_eq!(record.len(), 20);

        assert_eq!(record.get("Blood Pressure"), Some("120 mm Hg"));
        assert_eq!(record.get("Screen Time"), Some("5 hrs"));
        assert_eq!(record.get("Cholesterol"), Some("180 mg/dL"));
        assert_eq!(record.get("HbA1c"), Some("6.5%"));
        assert_eq!(record.get("Smoking"), Some("Former"));
        assert_eq!(record.get("Wears Glasses"), Some("Yes"));
        assert_eq!(record.get("Confidence"), Some("25.00%"));
    }

    #[test]
    fn test_whole_hba1c_keeps_decimal() {
        let input = PatientInput {
            hba1c: 7.0,
            ..PatientInput::default()
        };
        let record = build_report_record(&input, "x", 0.5, "y");
        assert_eq!(record.get("HbA1c"), Some("7.0%"));
    }

    #[test]
    fn test_lines_format() {
        let record = build_report_record(&PatientInput::default(), "L", 0.1, "R");
        let first = record.lines().next().expect("non-empty");
        assert_eq!(first, "Age: 35");
    }
}
