//! Feature encoding: `PatientInput` -> model-aligned `FeatureVector`.
//!
//! Categorical fields are one-hot encoded with the reference (baseline) level
//! dropped, booleans become 0/1 and continuous fields pass through unchanged.
//! The encoded columns are then placed into the classifier's own column order
//! through a [`FeatureSchema`] built once from the loaded artifact.

use std::collections::HashMap;
use std::sync::Arc;

use super::patient::{
    BlueLightExposure, OccupationType, PatientInput, SmokingStatus, TearProduction,
    VisionSharpness,
};

/// Number of columns produced by the encoder.
pub const ENCODED_WIDTH: usize = 22;

/// Columns produced by the encoder, in encoding order.
pub const ENCODED_COLUMNS: [&str; ENCODED_WIDTH] = [
    "Age",
    "Diabetes",
    "Blood_Pressure",
    "Screen_Time",
    "Blurred_Vision",
    "Eye_Pain",
    "Headache",
    "Cholesterol",
    "HbA1c",
    "Smoking_Status_Former",
    "Smoking_Status_Never",
    "Family_History",
    "Vision_Sharpness_Good",
    "Vision_Sharpness_Average",
    "Vision_Sharpness_Poor",
    "Occupation_Type_Screen-based",
    "Blue_Light_Exposure_Moderate",
    "Blue_Light_Exposure_High",
    "Night_Vision_Difficulty",
    "Tear_Production_Normal",
    "Tear_Production_Excessive",
    "Wears_Glasses_Yes",
];

/// Indicator columns of the reference levels. The encoder represents these
/// levels as all-zero, so a schema that expects one of them was trained with
/// a different reference level.
pub const BASELINE_COLUMNS: [&str; 6] = [
    "Smoking_Status_Current",
    "Vision_Sharpness_Excellent",
    "Occupation_Type_Non-screen-based",
    "Blue_Light_Exposure_Low",
    "Tear_Production_Low",
    "Wears_Glasses_No",
];

/// Schema construction failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("classifier reported an empty feature schema")]
    Empty,

    #[error("feature {0:?} appears more than once in the schema")]
    Duplicate(String),

    #[error("schema expects baseline indicator {0:?}; the encoder treats that level as the all-zero reference")]
    BaselineColumn(String),

    #[error("none of the {0} schema columns is produced by the encoder; every feature would be zero")]
    NoEncodedColumns(usize),
}

/// The classifier's ordered feature names plus a precomputed slot for every
/// encoded column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    /// `slots[i]` is the schema position of `ENCODED_COLUMNS[i]`.
    slots: [Option<usize>; ENCODED_WIDTH],
    unmatched: Vec<String>,
}

impl FeatureSchema {
    /// Build and validate the schema from the classifier's feature names.
    ///
    /// # Errors
    /// Returns `SchemaError` if the schema is empty, has duplicates, names a
    /// baseline indicator or shares no column with the encoder.
    pub fn new<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if BASELINE_COLUMNS.contains(&name.as_str()) {
                return Err(SchemaError::BaselineColumn(name.clone()));
            }
            if positions.insert(name.as_str(), idx).is_some() {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        let mut slots = [None; ENCODED_WIDTH];
        for (slot, column) in slots.iter_mut().zip(ENCODED_COLUMNS) {
            *slot = positions.get(column).copied();
            if slot.is_none() {
                tracing::debug!("Encoded column {column} not in classifier schema; dropped");
            }
        }
        if slots.iter().all(Option::is_none) {
            return Err(SchemaError::NoEncodedColumns(names.len()));
        }

        let unmatched: Vec<String> = names
            .iter()
            .filter(|n| !ENCODED_COLUMNS.contains(&n.as_str()))
            .cloned()
            .collect();
        for name in &unmatched {
            tracing::warn!("Schema column {name} is never produced by the encoder; it will be zero-filled");
        }

        Ok(Self {
            names,
            slots,
            unmatched,
        })
    }

    /// Feature names in classifier order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Schema columns the encoder never fills.
    #[must_use]
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    /// Encoded columns that the classifier does not use.
    #[must_use]
    pub fn dropped(&self) -> Vec<&'static str> {
        ENCODED_COLUMNS
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(col, slot)| slot.is_none().then_some(*col))
            .collect()
    }
}

/// Numeric features aligned to a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Feature names, in the same order as [`Self::values`].
    #[must_use]
    pub fn names(&self) -> &[String] {
        self.schema.names()
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named feature, if the schema has it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names()
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Raw encoded values, positionally matching [`ENCODED_COLUMNS`].
#[must_use]
pub fn encoded_values(input: &PatientInput) -> [f64; ENCODED_WIDTH] {
    [
        f64::from(input.age),
        flag(input.diabetes),
        f64::from(input.blood_pressure),
        f64::from(input.screen_time),
        flag(input.blurred_vision),
        flag(input.eye_pain),
        flag(input.headache),
        f64::from(input.cholesterol),
        input.hba1c,
        flag(input.smoking_status == SmokingStatus::Former),
        flag(input.smoking_status == SmokingStatus::Never),
        flag(input.family_history),
        flag(input.vision_sharpness == VisionSharpness::Good),
        flag(input.vision_sharpness == VisionSharpness::Average),
        flag(input.vision_sharpness == VisionSharpness::Poor),
        flag(input.occupation_type == OccupationType::ScreenBased),
        flag(input.blue_light_exposure == BlueLightExposure::Moderate),
        flag(input.blue_light_exposure == BlueLightExposure::High),
        flag(input.night_vision_difficulty),
        flag(input.tear_production == TearProduction::Normal),
        flag(input.tear_production == TearProduction::Excessive),
        flag(input.wears_glasses),
    ]
}

/// Encode a patient into the classifier's column order.
///
/// Schema columns the encoder does not produce are 0; encoded columns the
/// schema lacks are dropped.
#[must_use]
pub fn encode(input: &PatientInput, schema: &Arc<FeatureSchema>) -> FeatureVector {
    let mut values = vec![0.0; schema.len()];
    for (slot, value) in schema.slots.iter().zip(encoded_values(input)) {
        if let Some(idx) = slot {
            values[*idx] = value;
        }
    }

    FeatureVector {
        schema: Arc::clone(schema),
        values,
    }
}
