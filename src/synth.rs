//! Synthetic training data in the serving schema.
//!
//! Each column is drawn independently: the symptom columns are `normal` with
//! probability [`NORMAL_RATE`] and otherwise one of the group's four
//! abnormal options. A row's label comes from the summed symptom severity.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;

use crate::encoding::{ANIMALS, SYMPTOM_GROUPS};
use crate::types::FEATURE_COUNT;

pub const NORMAL_RATE: f64 = 0.6;

/// Severity score at or above which a row is labelled critical.
pub const CRITICAL_THRESHOLD: f64 = 2.0;

pub const CRITICAL: usize = 0;
pub const NORMAL: usize = 1;
pub const TARGET_CLASSES: [&str; 2] = ["critical", "normal"];

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub labels: [&'static str; FEATURE_COUNT],
    pub target: usize,
}

pub fn severity(symptom: &str) -> f64 {
    match symptom {
        "normal" => 0.0,
        "leukemia" | "brain_tumor" | "encephalitis" | "emaciation" | "pneumonia"
        | "difficulty_breathing" => 2.0,
        "anemia" | "swelling" | "fever" | "vomiting" | "lung_infection" | "bloating"
        | "diarrhea" | "abdominal_pain" => 1.0,
        _ => 0.5,
    }
}

pub fn score(labels: &[&str; FEATURE_COUNT]) -> f64 {
    labels[1..].iter().map(|s| severity(s)).sum()
}

pub fn label_for(labels: &[&str; FEATURE_COUNT]) -> usize {
    if score(labels) >= CRITICAL_THRESHOLD {
        CRITICAL
    } else {
        NORMAL
    }
}

fn draw_symptom<R: Rng>(options: &[&'static str; 5], rng: &mut R) -> &'static str {
    if rng.random_bool(NORMAL_RATE) {
        options[0]
    } else {
        options[rng.random_range(1..options.len())]
    }
}

/// `n` records; the same seed always yields the same data.
pub fn generate(n: usize, seed: u64, label_noise: f64) -> Vec<Record> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let label_noise = label_noise.clamp(0.0, 1.0);

    (0..n)
        .map(|_| {
            let mut labels = [""; FEATURE_COUNT];
            labels[0] = ANIMALS
                .choose(&mut rng)
                .map(|&(name, _)| name)
                .unwrap_or(ANIMALS[0].0);
            for (slot, (_, options)) in labels[1..].iter_mut().zip(SYMPTOM_GROUPS.iter()) {
                *slot = draw_symptom(options, &mut rng);
            }

            let mut target = label_for(&labels);
            if rng.random_bool(label_noise) {
                target = 1 - target;
            }
            Record { labels, target }
        })
        .collect()
}
