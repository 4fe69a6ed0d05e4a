//! Configuration file for the command-line interface.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tangent::{
    AdvisorConfig, BacktestConfig, optimize::FrontierConfig, risk::BlackLittermanConfig,
};

/// Settings read from `--config <file.json>`; every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) advisor: AdvisorConfig,
    pub(crate) frontier: FrontierConfig,
    pub(crate) backtest: BacktestConfig,
    pub(crate) black_litterman: BlackLittermanConfig,
}

impl AppConfig {
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangent::{Split, risk::CovarianceMethod};

    #[test]
    fn test_partial_config() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "backtest": {"split": {"training": 500}, "rebalancing_period": 21},
                "advisor": {"covariance": {"method": "ledoit_wolf"}},
                "frontier": {"points": 20, "seed": 7}
            }"#,
        )
        .unwrap();

        assert_eq!(config.backtest.split, Split::Training(500));
        assert_eq!(config.backtest.rebalancing_period, Some(21));
        assert!(!config.backtest.slicing);
        assert!(matches!(
            config.advisor.covariance,
            CovarianceMethod::LedoitWolf(_)
        ));
        assert_eq!(config.frontier.points, 20);
        assert_eq!(config.frontier.samples, 30_000);
        assert_eq!(config.black_litterman, BlackLittermanConfig::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
