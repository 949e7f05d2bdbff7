pub mod boosting;
pub mod ensemble;
pub mod forest;
pub mod logistic;

pub use boosting::{BoostingParams, GradientBoostingClassifier};
pub use ensemble::SoftVotingEnsemble;
pub use forest::{ForestParams, RandomForestClassifier};
pub use logistic::{LogisticParams, LogisticRegressionClassifier};
