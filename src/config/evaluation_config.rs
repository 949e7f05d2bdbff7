use super::{VarSource, parse_var};
use crate::application::evaluation::BarrierParams;
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct EvaluationEnvConfig {
    /// Minimum prediction age, and holding period, in days
    pub max_days: i64,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

impl EvaluationEnvConfig {
    pub fn from_vars(vars: &dyn VarSource) -> Result<Self> {
        let config = Self {
            max_days: parse_var(vars, "EVAL_MAX_DAYS", 10i64)?,
            stop_loss_pct: parse_var(vars, "EVAL_STOP_LOSS_PCT", dec!(0.03))?,
            take_profit_pct: parse_var(vars, "EVAL_TAKE_PROFIT_PCT", dec!(0.05))?,
        };
        if config.stop_loss_pct <= Decimal::ZERO || config.stop_loss_pct >= Decimal::ONE {
            anyhow::bail!("EVAL_STOP_LOSS_PCT must be in (0, 1)");
        }
        if config.take_profit_pct <= Decimal::ZERO {
            anyhow::bail!("EVAL_TAKE_PROFIT_PCT must be positive");
        }
        Ok(config)
    }

    pub fn barrier_params(&self) -> BarrierParams {
        BarrierParams {
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
            ..BarrierParams::default()
        }
    }
}
