//! Configuration loaded from environment variables (and `.env` via dotenvy in the binary).
//!
//! Organized by concern: providers, scan, backtest, evaluation and model.

mod backtest_config;
mod evaluation_config;
mod model_config;
mod provider_config;
mod scan_config;

pub use backtest_config::BacktestEnvConfig;
pub use evaluation_config::EvaluationEnvConfig;
pub use model_config::ModelEnvConfig;
pub use provider_config::{Mode, ProviderEnvConfig};
pub use scan_config::ScanEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Variable lookup; `env::var` in production, a map in tests.
pub trait VarSource {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl VarSource for std::collections::HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::HashMap::get(self, key).map(|v| v.to_string())
    }
}

pub(crate) fn var_or(vars: &dyn VarSource, key: &str, default: &str) -> String {
    vars.get(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_var<T>(vars: &dyn VarSource, key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(vars, key, &default.to_string())
        .trim()
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderEnvConfig,
    pub scan: ScanEnvConfig,
    pub backtest: BacktestEnvConfig,
    pub evaluation: EvaluationEnvConfig,
    pub model: ModelEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&ProcessEnv)
    }

    pub fn from_vars(vars: &dyn VarSource) -> Result<Self> {
        let config = Self {
            provider: ProviderEnvConfig::from_vars(vars)
                .context("Failed to load provider config")?,
            scan: ScanEnvConfig::from_vars(vars).context("Failed to load scan config")?,
            backtest: BacktestEnvConfig::from_vars(vars)
                .context("Failed to load backtest config")?,
            evaluation: EvaluationEnvConfig::from_vars(vars)
                .context("Failed to load evaluation config")?,
            model: ModelEnvConfig::from_vars(vars).context("Failed to load model config")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.provider.mode == Mode::Alpaca
            && (self.provider.alpaca_api_key.is_empty() || self.provider.alpaca_secret_key.is_empty())
        {
            anyhow::bail!("MODE=alpaca requires ALPACA_API_KEY and ALPACA_SECRET_KEY");
        }
        if self.scan.concurrency == 0 {
            anyhow::bail!("SCAN_CONCURRENCY must be at least 1");
        }
        if self.model.n_trees == 0 {
            anyhow::bail!("MODEL_N_TREES must be at least 1");
        }
        Ok(())
    }
}
