use serde::{Deserialize, Serialize};

use crate::interpret::Assessment;

/// Number of columns in a feature row.
pub const FEATURE_COUNT: usize = 6;

/// Column names in the order the classifier is trained with.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "AnimalName",
    "BloodBrainDisease",
    "AppearanceDisease",
    "GeneralDisease",
    "LungDisease",
    "AbdominalDisease",
];

/// Raw form submission. Every field is optional so that a missing field can
/// be reported as a notice instead of a 422 from the extractor.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormSubmission {
    pub animal_name: Option<String>,
    pub blood_brain_disease: Option<String>,
    pub appearance_disease: Option<String>,
    pub general_disease: Option<String>,
    pub lung_disease: Option<String>,
    pub abdominal_disease: Option<String>,
}

impl FormSubmission {
    /// Fields in feature order; blank values count as absent.
    pub fn fields(&self) -> [Option<&str>; FEATURE_COUNT] {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        [
            present(&self.animal_name),
            present(&self.blood_brain_disease),
            present(&self.appearance_disease),
            present(&self.general_disease),
            present(&self.lung_disease),
            present(&self.abdominal_disease),
        ]
    }
}

/// Encoded feature row, one integer per column in `FEATURE_NAMES` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureVector(pub [u32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_row(&self) -> Vec<f64> {
        self.0.iter().map(|&v| f64::from(v)).collect()
    }
}

/// Output of a single inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub class: usize,
    pub probabilities: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub features: FeatureVector,
    pub prediction: usize,
    pub probabilities: Vec<f64>,
    pub assessment: Assessment,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
}
