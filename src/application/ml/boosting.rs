use super::forest::to_matrix;
use crate::domain::ml::classifier::validate_training_set;
use crate::domain::ml::{ClassifierError, FeatureVector, ProbabilisticClassifier, TrainedClassifier};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

const MODEL_NAME: &str = "gradient_boosting";

/// Keeps the prior log-odds finite when every label is the same.
const PRIOR_CLAMP: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_samples_leaf: 1,
        }
    }
}

/// Gradient-boosted regression trees under log-loss.
///
/// Each round fits a tree to the residual `label - sigmoid(score)` and adds it to the
/// raw score scaled by the learning rate. Probabilities are `sigmoid(score)`.
#[derive(Debug, Clone, Default)]
pub struct GradientBoostingClassifier {
    params: BoostingParams,
}

impl GradientBoostingClassifier {
    pub fn new(params: BoostingParams) -> Self {
        Self { params }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ProbabilisticClassifier for GradientBoostingClassifier {
    fn fit(
        &self,
        features: &[FeatureVector],
        labels: &[bool],
    ) -> Result<Box<dyn TrainedClassifier>, ClassifierError> {
        validate_training_set(features, labels)?;
        let training_failed = |reason: String| ClassifierError::TrainingFailed {
            model: MODEL_NAME.to_string(),
            reason,
        };
        if !(self.params.learning_rate > 0.0 && self.params.learning_rate.is_finite()) {
            return Err(training_failed(format!(
                "learning_rate must be positive, got {}",
                self.params.learning_rate
            )));
        }

        let x = to_matrix(MODEL_NAME, features).map_err(training_failed)?;
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();

        let prior = (y.iter().sum::<f64>() / y.len() as f64).clamp(PRIOR_CLAMP, 1.0 - PRIOR_CLAMP);
        let base_score = (prior / (1.0 - prior)).ln();
        let mut scores = vec![base_score; y.len()];

        let tree_params = DecisionTreeRegressorParameters::default()
            .with_max_depth(self.params.max_depth)
            .with_min_samples_leaf(self.params.min_samples_leaf);

        debug!(
            "GradientBoostingClassifier: fitting {} rows (rounds: {}, rate: {}, depth: {})",
            features.len(),
            self.params.n_rounds,
            self.params.learning_rate,
            self.params.max_depth
        );

        let mut trees = Vec::with_capacity(self.params.n_rounds);
        for _ in 0..self.params.n_rounds {
            let residuals: Vec<f64> = y
                .iter()
                .zip(&scores)
                .map(|(target, score)| target - sigmoid(*score))
                .collect();
            let tree = DecisionTreeRegressor::fit(&x, &residuals, tree_params.clone())
                .map_err(|e| training_failed(e.to_string()))?;
            let step = tree
                .predict(&x)
                .map_err(|e| training_failed(e.to_string()))?;
            for (score, delta) in scores.iter_mut().zip(step) {
                *score += self.params.learning_rate * delta;
            }
            trees.push(tree);
        }

        Ok(Box::new(TrainedBoosting {
            base_score,
            learning_rate: self.params.learning_rate,
            trees,
        }))
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }
}

struct TrainedBoosting {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
}

impl TrainedClassifier for TrainedBoosting {
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let prediction_failed = |reason: String| ClassifierError::PredictionFailed {
            model: MODEL_NAME.to_string(),
            reason,
        };
        let x = to_matrix(MODEL_NAME, features).map_err(prediction_failed)?;
        let mut scores = vec![self.base_score; features.len()];
        for tree in &self.trees {
            let step = tree
                .predict(&x)
                .map_err(|e| prediction_failed(e.to_string()))?;
            for (score, delta) in scores.iter_mut().zip(step) {
                *score += self.learning_rate * delta;
            }
        }
        Ok(scores.into_iter().map(sigmoid).collect())
    }
}
