use super::{VarSource, parse_var};
use crate::application::ml::{BoostingParams, ForestParams, LogisticParams, SoftVotingEnsemble};
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub boost_rounds: usize,
    pub boost_learning_rate: f64,
    pub boost_max_depth: u16,
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_split: usize,
    pub logistic_epochs: usize,
    pub logistic_learning_rate: f64,
}

impl ModelEnvConfig {
    pub fn from_vars(vars: &dyn VarSource) -> Result<Self> {
        Ok(Self {
            boost_rounds: parse_var(vars, "MODEL_BOOST_ROUNDS", 100usize)?,
            boost_learning_rate: parse_var(vars, "MODEL_BOOST_LEARNING_RATE", 0.3f64)?,
            boost_max_depth: parse_var(vars, "MODEL_BOOST_MAX_DEPTH", 6u16)?,
            n_trees: parse_var(vars, "MODEL_N_TREES", 200usize)?,
            max_depth: parse_var(vars, "MODEL_MAX_DEPTH", 8u16)?,
            min_split: parse_var(vars, "MODEL_MIN_SPLIT", 5usize)?,
            logistic_epochs: parse_var(vars, "MODEL_LOGISTIC_EPOCHS", 500usize)?,
            logistic_learning_rate: parse_var(vars, "MODEL_LOGISTIC_LEARNING_RATE", 0.1f64)?,
        })
    }

    pub fn ensemble(&self) -> SoftVotingEnsemble {
        SoftVotingEnsemble::standard(
            BoostingParams {
                n_rounds: self.boost_rounds,
                learning_rate: self.boost_learning_rate,
                max_depth: self.boost_max_depth,
                ..BoostingParams::default()
            },
            ForestParams {
                n_trees: self.n_trees,
                max_depth: self.max_depth,
                min_samples_split: self.min_split,
            },
            LogisticParams {
                epochs: self.logistic_epochs,
                learning_rate: self.logistic_learning_rate,
            },
        )
    }
}
