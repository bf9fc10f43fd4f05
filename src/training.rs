use anyhow::{Context, Result};
use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use crate::artifacts::{Artifacts, ModelInfo};
use crate::config::TrainConfig;
use crate::encoding::FeatureEncoder;
use crate::engine::Engine;
use crate::forest::RandomForest;
use crate::interpret::interpret;
use crate::model::Model;
use crate::pipeline::PredictionPipeline;
use crate::synth::{self, Record, TARGET_CLASSES};
use crate::tree::DecisionTree;
use crate::types::{FEATURE_COUNT, FEATURE_NAMES};

#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Vec<usize>,
}

impl Dataset {
    pub fn from_records(records: &[Record], encoder: &FeatureEncoder) -> Result<Self> {
        let mut data = Vec::with_capacity(records.len() * FEATURE_COUNT);
        for record in records {
            let row = encoder.encode_labels(&record.labels)?;
            data.extend(row.as_row());
        }
        let x = Array2::from_shape_vec((records.len(), FEATURE_COUNT), data)?;
        let y = records.iter().map(|r| r.target).collect();
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), rows),
            y: rows.iter().map(|&r| self.y[r]).collect(),
        }
    }
}

/// Splits row indices into (train, test), keeping each class's share of the
/// test set close to `test_fraction`.
pub fn stratified_split(
    y: &[usize],
    n_classes: usize,
    test_fraction: f64,
    rng: &mut ChaCha8Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        rows.shuffle(&mut *rng);
        let n_test = ((rows.len() as f64 * test_fraction).round() as usize).min(rows.len());
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    correct as f64 / y_true.len() as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub class: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall, f1 and support. Undefined ratios are 0.
pub fn classification_report(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<ClassMetrics> {
    (0..n_classes)
        .map(|class| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&t, &p) in y_true.iter().zip(y_pred) {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                class,
                precision,
                recall,
                f1,
                support: tp + fn_,
            }
        })
        .collect()
}

pub fn predict_all(model: &Model, x: &Array2<f64>) -> Result<Vec<usize>> {
    x.rows()
        .into_iter()
        .map(|row| model.predict(row).map_err(anyhow::Error::from))
        .collect()
}

#[derive(Debug)]
pub struct Candidate {
    pub model: Model,
    pub accuracy: f64,
}

fn evaluate(model: Model, test: &Dataset, n_classes: usize) -> Result<Candidate> {
    let y_pred = predict_all(&model, &test.x)?;
    let accuracy = accuracy(&test.y, &y_pred);
    let report = classification_report(&test.y, &y_pred, n_classes);

    tracing::info!(model = model.name(), accuracy, "Model evaluated");
    for metrics in &report {
        tracing::info!(
            model = model.name(),
            class = TARGET_CLASSES.get(metrics.class).copied().unwrap_or("?"),
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            support = metrics.support,
            "Classification report"
        );
    }

    Ok(Candidate { model, accuracy })
}

/// Fits a decision tree and a random forest and keeps the one with the
/// higher held-out accuracy. The tree wins ties. With `n_estimators == 0`
/// only the tree is trained.
#[tracing::instrument(skip_all, fields(train = train.len(), test = test.len()))]
pub fn train_and_select(train: &Dataset, test: &Dataset, config: &TrainConfig) -> Result<Candidate> {
    let n_classes = TARGET_CLASSES.len();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let tree = DecisionTree::fit(&train.x, &train.y, n_classes, &config.tree_params(), &mut rng)?;
    let mut models = vec![Model::DecisionTree(tree)];
    if config.n_estimators > 0 {
        let forest = RandomForest::fit(&train.x, &train.y, n_classes, &config.forest_params(), &mut rng)?;
        models.push(Model::RandomForest(forest));
    } else {
        tracing::warn!("n_estimators is 0; skipping the random forest");
    }

    let mut best: Option<Candidate> = None;
    for model in models {
        let candidate = evaluate(model, test, n_classes)?;
        if best.as_ref().is_none_or(|b| candidate.accuracy > b.accuracy) {
            best = Some(candidate);
        }
    }

    let best = best.context("no candidate model was trained")?;
    tracing::info!(
        model = best.model.name(),
        accuracy = best.accuracy,
        "Best model selected"
    );
    Ok(best)
}

/// Synthesises data, trains, persists the artifacts and smoke-tests them.
pub fn run(config: &TrainConfig) -> Result<Artifacts> {
    let start = Instant::now();
    if !(0.0..1.0).contains(&config.test_fraction) {
        anyhow::bail!("test fraction {} is not in [0, 1)", config.test_fraction);
    }
    if !(0.0..=1.0).contains(&config.label_noise) {
        anyhow::bail!("label noise {} is not in [0, 1]", config.label_noise);
    }

    tracing::info!(samples = config.samples, seed = config.seed, "Creating sample dataset");
    let records = synth::generate(config.samples, config.seed, config.label_noise);
    let critical = records.iter().filter(|r| r.target == synth::CRITICAL).count();
    tracing::info!(
        critical,
        normal = records.len() - critical,
        "Health status distribution"
    );

    let encoders = FeatureEncoder::builtin();
    let dataset = Dataset::from_records(&records, &encoders)?;

    let mut split_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let (train_rows, test_rows) =
        stratified_split(&dataset.y, TARGET_CLASSES.len(), config.test_fraction, &mut split_rng);
    let train = dataset.select(&train_rows);
    let test = dataset.select(&test_rows);
    if train.is_empty() || test.is_empty() {
        anyhow::bail!(
            "split of {} samples left train={} test={}",
            dataset.len(),
            train.len(),
            test.len()
        );
    }
    tracing::info!(training_samples = train.len(), testing_samples = test.len(), "Data split");

    let best = train_and_select(&train, &test, config)?;

    let names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    let artifacts = Artifacts {
        info: ModelInfo {
            feature_names: names.clone(),
            categorical_features: names,
            target_classes: TARGET_CLASSES.iter().map(|s| s.to_string()).collect(),
            model_name: best.model.name().to_string(),
            accuracy: best.accuracy,
            trained_at: chrono::Utc::now(),
        },
        model: best.model,
        encoders,
    };
    artifacts
        .save(&config.output_dir)
        .with_context(|| format!("saving artifacts to {}", config.output_dir.display()))?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis(),
        accuracy = artifacts.info.accuracy,
        "Training complete"
    );

    if let Err(e) = smoke_test(&config.output_dir) {
        tracing::error!("Error testing saved model: {e:#}");
    }

    Ok(artifacts)
}

/// Reloads the saved artifacts and runs one prediction through them.
#[tracing::instrument]
pub fn smoke_test(dir: &std::path::Path) -> Result<()> {
    let pipeline = PredictionPipeline::load(dir)?;
    let labels = ["Dogs", "normal", "normal", "fever", "normal", "normal"];
    let features = pipeline.encoders().encode_labels(&labels)?;
    let prediction = pipeline.predict(&features)?;
    let assessment = interpret(&prediction);

    tracing::info!(
        ?labels,
        class = prediction.class,
        probabilities = ?prediction.probabilities,
        status = assessment.status_class.as_str(),
        "Test prediction successful"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stratified_split_keeps_class_shares() {
        let y: Vec<usize> = (0..100).map(|i| usize::from(i >= 30)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let (train, test) = stratified_split(&y, 2, 0.2, &mut rng);

        assert_eq!(train.len() + test.len(), 100);
        assert_eq!(test.iter().filter(|&&i| y[i] == 0).count(), 6);
        assert_eq!(test.iter().filter(|&&i| y[i] == 1).count(), 14);
        assert!(train.iter().all(|i| !test.contains(i)));
    }

    #[test]
    fn stratified_split_clamps_out_of_range_fractions() {
        let y = [0, 0, 1, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let (train, test) = stratified_split(&y, 2, 1.5, &mut rng);
        assert!(train.is_empty());
        assert_eq!(test, [0, 1, 2, 3, 4]);

        let (train, test) = stratified_split(&y, 2, -0.5, &mut rng);
        assert_eq!(train, [0, 1, 2, 3, 4]);
        assert!(test.is_empty());
    }

    #[test]
    fn run_rejects_out_of_range_fractions() {
        let dir = std::env::temp_dir().join(format!("animal-health-bad-{}", uuid::Uuid::new_v4()));
        for config in [
            TrainConfig {
                output_dir: dir.clone(),
                test_fraction: 1.5,
                ..TrainConfig::default()
            },
            TrainConfig {
                output_dir: dir.clone(),
                label_noise: f64::NAN,
                ..TrainConfig::default()
            },
        ] {
            let err = run(&config).unwrap_err();
            assert!(err.to_string().contains("is not in [0, 1"), "{err}");
        }
        assert!(!dir.exists());
    }

    #[test]
    fn zero_estimators_trains_only_the_tree() {
        let encoders = FeatureEncoder::builtin();
        let dataset = Dataset::from_records(&synth::generate(120, 3, 0.0), &encoders).unwrap();
        let rows: Vec<usize> = (0..dataset.len()).collect();
        let (train, test) = rows.split_at(90);
        let config = TrainConfig {
            n_estimators: 0,
            samples: 120,
            ..TrainConfig::default()
        };

        let best = train_and_select(&dataset.select(train), &dataset.select(test), &config).unwrap();
        assert!(matches!(best.model, Model::DecisionTree(_)));
    }

    #[test]
    fn accuracy_counts_matches() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn report_matches_hand_computed_values() {
        let y_true = [0, 0, 0, 1, 1];
        let y_pred = [0, 0, 1, 1, 0];
        let report = classification_report(&y_true, &y_pred, 2);

        assert_eq!(report[0].support, 3);
        assert!((report[0].precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((report[0].recall - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report[1].support, 2);
        assert!((report[1].precision - 0.5).abs() < 1e-9);
        assert!((report[1].f1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn report_handles_absent_predictions() {
        let report = classification_report(&[0, 0], &[0, 0], 2);
        assert_eq!(report[1].precision, 0.0);
        assert_eq!(report[1].f1, 0.0);
    }

    #[test]
    fn run_trains_persists_and_reloads() {
        let dir = std::env::temp_dir().join(format!("animal-health-train-{}", uuid::Uuid::new_v4()));
        let config = TrainConfig {
            output_dir: dir.clone(),
            samples: 300,
            n_estimators: 10,
            ..TrainConfig::default()
        };

        let artifacts = run(&config).unwrap();
        assert!(artifacts.info.accuracy > 0.65, "accuracy {}", artifacts.info.accuracy);
        assert_eq!(artifacts.info.target_classes, ["critical", "normal"]);

        let pipeline = PredictionPipeline::load(&dir).unwrap();
        assert_eq!(pipeline.model_name(), artifacts.model.name());
        assert_eq!(pipeline.encoders(), &FeatureEncoder::builtin());

        let features = pipeline
            .encoders()
            .encode_labels(&["Dogs", "brain_tumor", "emaciation", "normal", "pneumonia", "normal"])
            .unwrap();
        let prediction = pipeline.predict(&features).unwrap();
        assert_eq!(prediction.class, synth::CRITICAL);
        assert!((prediction.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        std::fs::remove_dir_all(&dir).ok();
    }
}
