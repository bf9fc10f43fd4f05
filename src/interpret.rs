use serde::Serialize;

use crate::types::Prediction;

pub const CRITICAL_STATUS: &str = "Critical - Immediate veterinary attention required!";
pub const NORMAL_STATUS: &str = "Normal - Animal appears healthy";
pub const CRITICAL_RECOMMENDATION: &str = "Please consult a veterinarian immediately. The animal shows signs that require urgent medical attention.";
pub const NORMAL_RECOMMENDATION: &str =
    "The animal appears to be in good health. Continue regular care and monitoring.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Critical,
    Normal,
}

impl StatusClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Normal => "normal",
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display-ready reading of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub health_status: &'static str,
    pub status_class: StatusClass,
    /// Max class probability as a percentage, two decimals.
    pub confidence: f64,
    pub recommendation: &'static str,
}

/// Class 0 is critical, anything else is normal. Confidence is the raw max
/// probability; no thresholding or calibration.
pub fn interpret(prediction: &Prediction) -> Assessment {
    let (health_status, status_class, recommendation) = if prediction.class == 0 {
        (CRITICAL_STATUS, StatusClass::Critical, CRITICAL_RECOMMENDATION)
    } else {
        (NORMAL_STATUS, StatusClass::Normal, NORMAL_RECOMMENDATION)
    };

    Assessment {
        health_status,
        status_class,
        confidence: confidence_percent(&prediction.probabilities),
        recommendation,
    }
}

pub fn confidence_percent(probabilities: &[f64]) -> f64 {
    let max = probabilities
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .fold(0.0_f64, f64::max);
    round2(100.0 * max).clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(class: usize, probabilities: &[f64]) -> Prediction {
        Prediction {
            class,
            probabilities: probabilities.to_vec(),
        }
    }

    #[test]
    fn class_one_is_normal() {
        let assessment = interpret(&prediction(1, &[0.1, 0.9]));
        assert_eq!(assessment.health_status, "Normal - Animal appears healthy");
        assert_eq!(assessment.status_class, StatusClass::Normal);
        assert_eq!(assessment.confidence, 90.0);
        assert_eq!(assessment.recommendation, NORMAL_RECOMMENDATION);
    }

    #[test]
    fn class_zero_is_critical() {
        let assessment = interpret(&prediction(0, &[0.7345, 0.2655]));
        assert_eq!(assessment.status_class, StatusClass::Critical);
        assert_eq!(assessment.status_class.to_string(), "critical");
        assert_eq!(assessment.health_status, CRITICAL_STATUS);
        assert_eq!(assessment.confidence, 73.45);
    }

    #[test]
    fn confidence_is_rounded_to_two_decimals() {
        assert_eq!(confidence_percent(&[0.123456, 0.876544]), 87.65);
        assert_eq!(confidence_percent(&[1.0 / 3.0, 2.0 / 3.0]), 66.67);
        assert_eq!(confidence_percent(&[0.5, 0.5]), 50.0);
    }

    #[test]
    fn confidence_stays_in_range() {
        assert_eq!(confidence_percent(&[]), 0.0);
        assert_eq!(confidence_percent(&[1.0, 0.0]), 100.0);
        assert_eq!(confidence_percent(&[1.0000001, 0.0]), 100.0);
        assert_eq!(confidence_percent(&[f64::NAN, 0.4]), 40.0);
    }

    #[test]
    fn only_two_status_classes_exist() {
        for class in 0..5 {
            let status = interpret(&prediction(class, &[0.5, 0.5])).status_class;
            assert!(matches!(status, StatusClass::Critical | StatusClass::Normal));
            assert_eq!(status == StatusClass::Critical, class == 0);
        }
    }
}
