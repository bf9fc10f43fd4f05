use clap::Parser;
use std::path::PathBuf;

use crate::forest::ForestParams;
use crate::tree::TreeParams;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Directory holding the trained model, label encoders and model info
    #[arg(long, env = "MODEL_DIR", default_value = "models")]
    pub model_dir: PathBuf,
}

impl Config {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Train the animal health classifier", long_about = None)]
pub struct TrainConfig {
    /// Directory the model artifacts are written to
    #[arg(long, env = "MODEL_DIR", default_value = "models")]
    pub output_dir: PathBuf,

    /// Number of synthetic records to generate
    #[arg(long, default_value = "1000")]
    pub samples: usize,

    /// Seed for data synthesis, splitting and model fitting
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Fraction of records held out for evaluation
    #[arg(long, default_value = "0.2", value_parser = parse_fraction)]
    pub test_fraction: f64,

    /// Maximum depth of every tree
    #[arg(long, default_value = "10")]
    pub max_depth: usize,

    /// Number of trees in the random forest
    #[arg(long, default_value = "100", value_parser = parse_positive)]
    pub n_estimators: usize,

    /// Probability of flipping a synthetic label
    #[arg(long, default_value = "0.05", value_parser = parse_fraction)]
    pub label_noise: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("models"),
            samples: 1000,
            seed: 42,
            test_fraction: 0.2,
            max_depth: 10,
            n_estimators: 100,
            label_noise: 0.05,
        }
    }
}

impl TrainConfig {
    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            ..TreeParams::default()
        }
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            ..ForestParams::default()
        }
    }
}

fn parse_fraction(value: &str) -> Result<f64, String> {
    let fraction: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if (0.0..1.0).contains(&fraction) {
        Ok(fraction)
    } else {
        Err(format!("{fraction} is not in [0, 1)"))
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>().map_err(|e| format!("{e}"))? {
        0 => Err("must be at least 1".to_string()),
        n => Ok(n),
    }
}
