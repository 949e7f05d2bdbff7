pub mod walk_forward;

pub use walk_forward::{WalkForwardBacktester, evaluate_window, partition_rows, score_predictions};
