use super::boosting::{BoostingParams, GradientBoostingClassifier};
use super::forest::{ForestParams, RandomForestClassifier};
use super::logistic::{LogisticParams, LogisticRegressionClassifier};
use crate::domain::ml::classifier::validate_training_set;
use crate::domain::ml::{ClassifierError, FeatureVector, ProbabilisticClassifier, TrainedClassifier};
use std::sync::Arc;
use tracing::debug;

/// Soft-voting ensemble: the unweighted mean of every member's positive-class probability.
#[derive(Clone)]
pub struct SoftVotingEnsemble {
    members: Vec<Arc<dyn ProbabilisticClassifier>>,
}

impl SoftVotingEnsemble {
    pub fn new(members: Vec<Arc<dyn ProbabilisticClassifier>>) -> Self {
        Self { members }
    }

    /// Gradient boosting, random forest and logistic regression.
    pub fn standard(
        boosting: BoostingParams,
        forest: ForestParams,
        logistic: LogisticParams,
    ) -> Self {
        Self::new(vec![
            Arc::new(GradientBoostingClassifier::new(boosting)),
            Arc::new(RandomForestClassifier::new(forest)),
            Arc::new(LogisticRegressionClassifier::new(logistic)),
        ])
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }
}

impl Default for SoftVotingEnsemble {
    fn default() -> Self {
        Self::standard(
            BoostingParams::default(),
            ForestParams::default(),
            LogisticParams::default(),
        )
    }
}

impl ProbabilisticClassifier for SoftVotingEnsemble {
    fn fit(
        &self,
        features: &[FeatureVector],
        labels: &[bool],
    ) -> Result<Box<dyn TrainedClassifier>, ClassifierError> {
        validate_training_set(features, labels)?;
        if self.members.is_empty() {
            return Err(ClassifierError::TrainingFailed {
                model: self.name().to_string(),
                reason: "ensemble has no members".to_string(),
            });
        }

        let fitted = self
            .members
            .iter()
            .map(|m| m.fit(features, labels))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "SoftVotingEnsemble: fitted {} members on {} rows",
            fitted.len(),
            features.len()
        );
        Ok(Box::new(TrainedEnsemble { members: fitted }))
    }

    fn name(&self) -> &str {
        "soft_voting_ensemble"
    }
}

struct TrainedEnsemble {
    members: Vec<Box<dyn TrainedClassifier>>,
}

impl TrainedClassifier for TrainedEnsemble {
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        let mut sums = vec![0.0; features.len()];
        for member in &self.members {
            let probs = member.predict_probability(features)?;
            for (s, p) in sums.iter_mut().zip(probs) {
                *s += p;
            }
        }
        let count = self.members.len() as f64;
        Ok(sums.into_iter().map(|s| (s / count).clamp(0.0, 1.0)).collect())
    }
}
