use super::feature_registry::FeatureVector;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Features and labels differ in length: {features} features, {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("{model} training failed: {reason}")]
    TrainingFailed { model: String, reason: String },

    #[error("{model} prediction failed: {reason}")]
    PredictionFailed { model: String, reason: String },
}

/// A trainable binary classifier strategy.
///
/// `fit` never mutates the strategy: every call returns an independent model, so no state
/// leaks from one training run into the next.
pub trait ProbabilisticClassifier: Send + Sync {
    fn fit(
        &self,
        features: &[FeatureVector],
        labels: &[bool],
    ) -> Result<Box<dyn TrainedClassifier>, ClassifierError>;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// A fitted model producing positive-class probabilities in `[0, 1]`.
pub trait TrainedClassifier: Send + Sync {
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError>;
}

/// Shared input validation for `ProbabilisticClassifier::fit` implementations.
pub fn validate_training_set(
    features: &[FeatureVector],
    labels: &[bool],
) -> Result<(), ClassifierError> {
    if features.len() != labels.len() {
        return Err(ClassifierError::LengthMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if features.is_empty() {
        return Err(ClassifierError::EmptyTrainingSet);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv() -> FeatureVector {
        FeatureVector {
            rsi: 40.0,
            sma_fast: 10.0,
            sma_slow: 11.0,
            atr: 0.2,
            sentiment: 0.0,
        }
    }

    #[test]
    fn test_validate_rejects_mismatch() {
        let err = validate_training_set(&[fv(), fv()], &[true]).unwrap_err();
        assert_eq!(
            err,
            ClassifierError::LengthMismatch {
                features: 2,
                labels: 1
            }
        );
        assert!(err.to_string().contains("2 features"));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert_eq!(
            validate_training_set(&[], &[]).unwrap_err(),
            ClassifierError::EmptyTrainingSet
        );
    }

    #[test]
    fn test_validate_accepts_single_class() {
        assert!(validate_training_set(&[fv(), fv()], &[false, false]).is_ok());
    }
}
