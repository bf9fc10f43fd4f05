//! Category encoding: the static label tables and the per-column label
//! encoders that are persisted next to a trained model.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector, FormSubmission};

pub const ANIMALS: [(&str, u32); 8] = [
    ("Birds", 0),
    ("Cats", 1),
    ("Dogs", 2),
    ("Horses", 3),
    ("Cows", 4),
    ("Sheep", 5),
    ("Goats", 6),
    ("Pigs", 7),
];

/// Flat symptom namespace shared by all five symptom columns.
pub const SYMPTOMS: [(&str, u32); 21] = [
    ("normal", 0),
    ("anemia", 1),
    ("leukemia", 2),
    ("brain_tumor", 3),
    ("encephalitis", 4),
    ("skin_lesions", 5),
    ("hair_loss", 6),
    ("emaciation", 7),
    ("swelling", 8),
    ("fever", 9),
    ("lethargy", 10),
    ("coughing", 11),
    ("vomiting", 12),
    ("pneumonia", 13),
    ("asthma", 14),
    ("difficulty_breathing", 15),
    ("lung_infection", 16),
    ("bloating", 17),
    ("diarrhea", 18),
    ("abdominal_pain", 19),
    ("constipation", 20),
];

/// Options offered by the form for each symptom group, in display order.
pub const SYMPTOM_GROUPS: [(&str, [&str; 5]); 5] = [
    (
        "blood_brain",
        ["normal", "anemia", "leukemia", "brain_tumor", "encephalitis"],
    ),
    (
        "appearance",
        ["normal", "skin_lesions", "hair_loss", "emaciation", "swelling"],
    ),
    (
        "general",
        ["normal", "fever", "lethargy", "coughing", "vomiting"],
    ),
    (
        "lung",
        [
            "normal",
            "pneumonia",
            "asthma",
            "difficulty_breathing",
            "lung_infection",
        ],
    ),
    (
        "abdominal",
        [
            "normal",
            "bloating",
            "diarrhea",
            "abdominal_pain",
            "constipation",
        ],
    ),
];

/// Looks `label` up in `table`, falling back to 0 for anything unknown.
pub fn encode(label: &str, table: &[(&str, u32)]) -> u32 {
    table
        .iter()
        .find(|(name, _)| *name == label)
        .map(|&(_, code)| code)
        .unwrap_or(0)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("unknown label {label:?} for column {column}")]
    UnknownLabel { column: String, label: String },
    #[error("no value submitted for column {0}")]
    MissingField(String),
    #[error("no encoder for column {0}")]
    MissingColumn(String),
}

/// Ordered list of classes; a label's code is its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Sorted unique classes of `values`.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Keeps the given order.
    pub fn from_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.classes
            .iter()
            .position(|c| c == label)
            .map(|idx| idx as u32)
    }

    pub fn inverse_transform(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }
}

fn table_encoder(table: &[(&str, u32)]) -> LabelEncoder {
    let mut entries = table.to_vec();
    entries.sort_by_key(|&(_, code)| code);
    LabelEncoder::from_classes(entries.into_iter().map(|(name, _)| name))
}

/// Per-column encoders keyed by feature name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureEncoder {
    columns: BTreeMap<String, LabelEncoder>,
}

impl FeatureEncoder {
    /// Encoders equivalent to `ANIMALS` and `SYMPTOMS`.
    pub fn builtin() -> Self {
        let animals = table_encoder(&ANIMALS);
        let symptoms = table_encoder(&SYMPTOMS);

        let columns = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let encoder = if idx == 0 {
                    animals.clone()
                } else {
                    symptoms.clone()
                };
                (name.to_string(), encoder)
            })
            .collect();

        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&LabelEncoder> {
        self.columns.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, encoder: LabelEncoder) {
        self.columns.insert(name.into(), encoder);
    }

    /// Fails if any feature column has no encoder.
    pub fn validate(&self) -> Result<(), EncodeError> {
        for name in FEATURE_NAMES {
            if !self.columns.contains_key(name) {
                return Err(EncodeError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn transform(&self, column: &str, label: &str) -> Result<u32, EncodeError> {
        let encoder = self
            .columns
            .get(column)
            .ok_or_else(|| EncodeError::MissingColumn(column.to_string()))?;
        encoder
            .get(label)
            .ok_or_else(|| EncodeError::UnknownLabel {
                column: column.to_string(),
                label: label.to_string(),
            })
    }

    pub fn encode_labels(&self, labels: &[&str; FEATURE_COUNT]) -> Result<FeatureVector, EncodeError> {
        let mut row = [0u32; FEATURE_COUNT];
        for (slot, (column, label)) in row.iter_mut().zip(FEATURE_NAMES.iter().zip(labels)) {
            *slot = self.transform(column, label)?;
        }
        Ok(FeatureVector(row))
    }

    /// Strict encoding of a form submission. The first absent or blank
    /// field is reported before any label is looked up.
    pub fn encode_row(&self, submission: &FormSubmission) -> Result<FeatureVector, EncodeError> {
        let fields = submission.fields();
        let mut labels = [""; FEATURE_COUNT];
        for ((slot, field), column) in labels.iter_mut().zip(fields).zip(FEATURE_NAMES) {
            *slot = field.ok_or_else(|| EncodeError::MissingField(column.to_string()))?;
        }
        self.encode_labels(&labels)
    }
}

/// Lenient encoding through the static tables; unknown labels become 0.
pub fn encode_lenient(labels: &[&str; FEATURE_COUNT]) -> FeatureVector {
    let mut row = [0u32; FEATURE_COUNT];
    row[0] = encode(labels[0], &ANIMALS);
    for (slot, label) in row.iter_mut().zip(labels.iter()).skip(1) {
        *slot = encode(label, &SYMPTOMS);
    }
    FeatureVector(row)
}
