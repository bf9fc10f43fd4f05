use anyhow::Result;

use crate::types::{FeatureVector, Prediction};

/// Anything that can turn an encoded feature row into a class and its
/// probability distribution.
pub trait Engine: Send + Sync {
    fn model_name(&self) -> &str;

    fn predict(&self, features: &FeatureVector) -> Result<Prediction>;
}
