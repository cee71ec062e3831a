//! Patient intake types for vision-risk screening.
//!
//! One `PatientInput` is built per form submission and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declares a categorical form field whose levels parse from and display as
/// the exact strings shown on the intake form.
macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $( $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Field label used in error messages.
            pub const FIELD: &'static str = $field;

            /// All levels in form order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Level text as displayed on the form.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Position of this level in [`Self::ALL`].
            #[must_use]
            pub fn index(&self) -> usize {
                Self::ALL.iter().position(|l| l == self).unwrap_or(0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok(Self::$variant),)+
                    other => Err(format!("{}: unknown level {other:?}", Self::FIELD)),
                }
            }
        }
    };
}

categorical! {
    /// Smoking history.
    SmokingStatus, "Smoking Status" {
        Never => "Never",
        Former => "Former",
        Current => "Current",
    }
}

categorical! {
    /// Tear film production.
    TearProduction, "Tear Production" {
        Low => "Low",
        Normal => "Normal",
        Excessive => "Excessive",
    }
}

categorical! {
    /// Self-reported sharpness of vision.
    VisionSharpness, "Vision Sharpness" {
        Excellent => "Excellent",
        Good => "Good",
        Average => "Average",
        Poor => "Poor",
    }
}

categorical! {
    /// Whether most working hours are spent at a screen.
    OccupationType, "Occupation Type" {
        ScreenBased => "Screen-based",
        NonScreenBased => "Non-screen-based",
    }
}

categorical! {
    /// Daily blue-light exposure.
    BlueLightExposure, "Blue Light Exposure" {
        Low => "Low",
        Moderate => "Moderate",
        High => "High",
    }
}

/// Inclusive bounds enforced by the intake form widgets.
pub mod limits {
    use std::ops::RangeInclusive;

    pub const AGE: RangeInclusive<u32> = 18..=90;
    pub const BLOOD_PRESSURE: RangeInclusive<u32> = 90..=180;
    pub const SCREEN_TIME: RangeInclusive<u32> = 0..=12;
    pub const CHOLESTEROL: RangeInclusive<u32> = 100..=300;
    pub const HBA1C: RangeInclusive<f64> = 4.0..=14.0;
}

/// Structured patient attributes collected by the intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    /// Age in years
    pub age: u32,
    pub diabetes: bool,
    /// Blood pressure in mm Hg
    pub blood_pressure: u32,
    /// Average screen time in hours per day
    pub screen_time: u32,
    /// Cholesterol in mg/dL
    pub cholesterol: u32,
    /// Glycated haemoglobin in %
    pub hba1c: f64,
    pub blurred_vision: bool,
    pub eye_pain: bool,
    pub family_history: bool,
    pub night_vision_difficulty: bool,
    /// Frequent headaches
    pub headache: bool,
    pub smoking_status: SmokingStatus,
    pub tear_production: TearProduction,
    pub wears_glasses: bool,
    pub vision_sharpness: VisionSharpness,
    pub occupation_type: OccupationType,
    pub blue_light_exposure: BlueLightExposure,
}

impl Default for PatientInput {
    /// The values the intake form starts with.
    fn default() -> Self {
        Self {
            age: 35,
            diabetes: false,
            blood_pressure: 120,
            screen_time: 5,
            cholesterol: 180,
            hba1c: 6.5,
            blurred_vision: false,
            eye_pain: false,
            family_history: false,
            night_vision_difficulty: false,
            headache: false,
            smoking_status: SmokingStatus::Never,
            tear_production: TearProduction::Low,
            wears_glasses: true,
            vision_sharpness: VisionSharpness::Excellent,
            occupation_type: OccupationType::ScreenBased,
            blue_light_exposure: BlueLightExposure::Low,
        }
    }
}

impl PatientInput {
    /// Check every numeric field against the form bounds.
    ///
    /// # Errors
    /// Returns all violations, one message per field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !limits::AGE.contains(&self.age) {
            errors.push(format!("Age {} out of range [18, 90]", self.age));
        }
        if !limits::BLOOD_PRESSURE.contains(&self.blood_pressure) {
            errors.push(format!(
                "Blood pressure {} out of range [90, 180]",
                self.blood_pressure
            ));
        }
        if !limits::SCREEN_TIME.contains(&self.screen_time) {
            errors.push(format!(
                "Screen time {} out of range [0, 12]",
                self.screen_time
            ));
        }
        if !limits::CHOLESTEROL.contains(&self.cholesterol) {
            errors.push(format!(
                "Cholesterol {} out of range [100, 300]",
                self.cholesterol
            ));
        }
        if !self.hba1c.is_finite() || !limits::HBA1C.contains(&self.hba1c) {
            errors.push(format!("HbA1c {} out of range [4.0, 14.0]", self.hba1c));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_form() {
        let input = PatientInput::default();
        assert_eq!(input.age, 35);
        assert_eq!(input.blood_pressure, 120);
        assert!(input.wears_glasses);
        assert_eq!(input.occupation_type, OccupationType::ScreenBased);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_every_violation() {
        let input = PatientInput {
            age: 10,
            blood_pressure: 200,
            hba1c: f64::NAN,
            ..PatientInput::default()
        };
        let errors = input.validate().expect_err("should be invalid");
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("Age"));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let input = PatientInput {
            age: 90,
            screen_time: 0,
            cholesterol: 300,
            hba1c: 4.0,
            ..PatientInput::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_levels_round_trip_form_strings() {
        assert_eq!(
            "Non-screen-based".parse::<OccupationType>(),
            Ok(OccupationType::NonScreenBased)
        );
        assert_eq!(VisionSharpness::Average.to_string(), "Average");
        assert_eq!(BlueLightExposure::ALL.len(), 3);
        assert_eq!(TearProduction::Excessive.index(), 2);
        assert!("Sometimes".parse::<SmokingStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_form_strings() {
        let json = serde_json::to_string(&OccupationType::ScreenBased).expect("serialize");
        assert_eq!(json, "\"Screen-based\"");
    }
}
