pub mod feature_builder;

pub use feature_builder::{FeatureBuilder, FeaturePipeline};
