pub mod classifier;
pub mod feature_registry;

pub use classifier::{ClassifierError, ProbabilisticClassifier, TrainedClassifier};
pub use feature_registry::{FeatureParams, FeatureRow, FeatureSet, FeatureVector};
