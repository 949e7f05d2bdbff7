use crate::domain::ml::classifier::validate_training_set;
use crate::domain::ml::{ClassifierError, FeatureVector, ProbabilisticClassifier, TrainedClassifier};
use crate::domain::ml::feature_registry::FEATURE_NAMES;
use statrs::statistics::Statistics;

const MODEL_NAME: &str = "logistic_regression";
const MIN_STD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticParams {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
        }
    }
}

/// Batch gradient descent logistic regression on z-scored features.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegressionClassifier {
    params: LogisticParams,
}

impl LogisticRegressionClassifier {
    pub fn new(params: LogisticParams) -> Self {
        Self { params }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Per-column mean and standard deviation learned at fit time.
#[derive(Debug, Clone)]
struct Scaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Scaler {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let (means, stds) = (0..FEATURE_NAMES.len())
            .map(|col| {
                let column: Vec<f64> = rows.iter().map(|row| row[col]).collect();
                let sd = column.iter().population_std_dev();
                // Constant columns scale to zero instead of dividing by zero.
                let sd = if sd.is_finite() && sd >= MIN_STD { sd } else { 1.0 };
                (column.iter().mean(), sd)
            })
            .unzip();
        Self { means, stds }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

impl ProbabilisticClassifier for LogisticRegressionClassifier {
    fn fit(
        &self,
        features: &[FeatureVector],
        labels: &[bool],
    ) -> Result<Box<dyn TrainedClassifier>, ClassifierError> {
        validate_training_set(features, labels)?;

        let raw: Vec<Vec<f64>> = features.iter().map(FeatureVector::to_vec).collect();
        if raw.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ClassifierError::TrainingFailed {
                model: MODEL_NAME.to_string(),
                reason: "non-finite feature value".to_string(),
            });
        }
        let scaler = Scaler::fit(&raw);
        let samples: Vec<(Vec<f64>, f64)> = raw
            .iter()
            .zip(labels)
            .map(|(row, &l)| (scaler.transform(row), if l { 1.0 } else { 0.0 }))
            .collect();

        let width = FEATURE_NAMES.len();
        let mut bias = 0.0;
        let mut weights = vec![0.0; width];
        let n = samples.len() as f64;

        for _epoch in 0..self.params.epochs {
            let mut grad_bias = 0.0;
            let mut grad_weights = vec![0.0; width];

            for (x, y) in &samples {
                let z = bias + weights.iter().zip(x).map(|(w, f)| w * f).sum::<f64>();
                let error = sigmoid(z) - y;
                grad_bias += error;
                for (g, f) in grad_weights.iter_mut().zip(x) {
                    *g += error * f;
                }
            }

            bias -= self.params.learning_rate * grad_bias / n;
            for (w, g) in weights.iter_mut().zip(&grad_weights) {
                *w -= self.params.learning_rate * g / n;
            }
        }

        Ok(Box::new(TrainedLogistic {
            scaler,
            bias,
            weights,
        }))
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }
}

struct TrainedLogistic {
    scaler: Scaler,
    bias: f64,
    weights: Vec<f64>,
}

impl TrainedClassifier for TrainedLogistic {
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        Ok(features
            .iter()
            .map(|fv| {
                let x = self.scaler.transform(&fv.to_vec());
                let z = self.bias
                    + self.weights.iter().zip(&x).map(|(w, f)| w * f).sum::<f64>();
                sigmoid(z)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(rsi: f64) -> FeatureVector {
        FeatureVector {
            rsi,
            sma_fast: 100.0,
            sma_slow: 100.0,
            atr: 1.0,
            sentiment: 0.0,
        }
    }

    #[test]
    fn test_learns_monotone_relationship() {
        let features: Vec<_> = (0..60).map(|i| fv(i as f64)).collect();
        let labels: Vec<_> = (0..60).map(|i| i < 30).collect();
        let model = LogisticRegressionClassifier::default()
            .fit(&features, &labels)
            .unwrap();
        let probs = model.predict_probability(&[fv(5.0), fv(55.0)]).unwrap();
        assert!(probs[0] > 0.8);
        assert!(probs[1] < 0.2);
    }

    #[test]
    fn test_single_class_stays_bounded() {
        let features: Vec<_> = (0..10).map(|i| fv(i as f64)).collect();
        let labels = vec![false; 10];
        let model = LogisticRegressionClassifier::default()
            .fit(&features, &labels)
            .unwrap();
        let probs = model.predict_probability(&features).unwrap();
        assert!(probs.iter().all(|p| (0.0..0.5).contains(p)));
    }

    #[test]
    fn test_constant_columns_do_not_produce_nan() {
        let features = vec![fv(50.0); 8];
        let labels = vec![true, false, true, false, true, false, true, false];
        let model = LogisticRegressionClassifier::default()
            .fit(&features, &labels)
            .unwrap();
        let p = model.predict_probability(&[fv(50.0)]).unwrap()[0];
        assert!((p - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_scaler_uses_population_moments() {
        let rows = vec![
            vec![1.0, 10.0, 5.0, 0.0, 0.0],
            vec![3.0, 10.0, 7.0, 0.0, 0.0],
        ];
        let scaler = Scaler::fit(&rows);
        assert_eq!(scaler.means, vec![2.0, 10.0, 6.0, 0.0, 0.0]);
        assert_eq!(scaler.stds, vec![1.0, 1.0, 1.0, 1.0, 1.0]);

        let rows = vec![vec![0.0; 5], vec![4.0, 0.0, 0.0, 0.0, 0.0]];
        let scaler = Scaler::fit(&rows);
        assert!((scaler.stds[0] - 2.0).abs() < 1e-12);
        assert!((scaler.transform(&[4.0, 0.0, 0.0, 0.0, 0.0])[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let err = LogisticRegressionClassifier::default()
            .fit(&[fv(f64::NAN)], &[true])
            .err()
            .unwrap();
        assert!(matches!(err, ClassifierError::TrainingFailed { .. }));
    }
}
