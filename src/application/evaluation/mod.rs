pub mod outcome_evaluator;

pub use outcome_evaluator::{BarrierOutcome, BarrierParams, OutcomeEvaluator, evaluate_barriers};
