use crate::domain::ml::classifier::validate_training_set;
use crate::domain::ml::{ClassifierError, FeatureVector, ProbabilisticClassifier, TrainedClassifier};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

const MODEL_NAME: &str = "random_forest";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 8,
            min_samples_split: 5,
        }
    }
}

/// Random forest over 0/1 targets; the mean leaf value across trees is read as P(positive).
#[derive(Debug, Clone, Default)]
pub struct RandomForestClassifier {
    params: ForestParams,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }
}

pub(crate) fn to_matrix(
    model: &str,
    features: &[FeatureVector],
) -> Result<DenseMatrix<f64>, String> {
    let rows: Vec<Vec<f64>> = features.iter().map(FeatureVector::to_vec).collect();
    DenseMatrix::from_2d_vec(&rows).map_err(|e| format!("{} matrix error: {}", model, e))
}

impl ProbabilisticClassifier for RandomForestClassifier {
    fn fit(
        &self,
        features: &[FeatureVector],
        labels: &[bool],
    ) -> Result<Box<dyn TrainedClassifier>, ClassifierError> {
        validate_training_set(features, labels)?;

        let x = to_matrix(MODEL_NAME, features).map_err(|reason| ClassifierError::TrainingFailed {
            model: MODEL_NAME.to_string(),
            reason,
        })?;
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();

        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.params.n_trees)
            .with_max_depth(self.params.max_depth)
            .with_min_samples_split(self.params.min_samples_split);

        debug!(
            "RandomForestClassifier: fitting {} rows (trees: {}, depth: {}, min split: {})",
            features.len(),
            self.params.n_trees,
            self.params.max_depth,
            self.params.min_samples_split
        );

        let model = RandomForestRegressor::fit(&x, &y, params).map_err(|e| {
            ClassifierError::TrainingFailed {
                model: MODEL_NAME.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Box::new(TrainedForest { model }))
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }
}

struct TrainedForest {
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl TrainedClassifier for TrainedForest {
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let prediction_failed = |reason: String| ClassifierError::PredictionFailed {
            model: MODEL_NAME.to_string(),
            reason,
        };
        let x = to_matrix(MODEL_NAME, features).map_err(prediction_failed)?;
        let raw = self
            .model
            .predict(&x)
            .map_err(|e| prediction_failed(e.to_string()))?;
        Ok(raw.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
    }
}
