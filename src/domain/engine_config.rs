//! Engine configuration: structures, config-file builders, and load-time
//! validation. Every configuration mistake is caught here, before any
//! computation starts.

use chrono::NaiveDate;

use super::engine::{FactorConfig, MomentumLeg};
use super::error::QuantfolioError;
use super::factor::Factor;
use super::scoring::{default_profiles, RiskProfile};
use super::selection::WeightScheme;
use crate::ports::config_port::ConfigPort;

/// How often the portfolio is recomputed and holdings replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceFrequency {
    Monthly,
    Quarterly,
    Annual,
}

impl RebalanceFrequency {
    pub fn name(&self) -> &'static str {
        match self {
            RebalanceFrequency::Monthly => "monthly",
            RebalanceFrequency::Quarterly => "quarterly",
            RebalanceFrequency::Annual => "annual",
        }
    }

    pub fn from_name(name: &str) -> Option<RebalanceFrequency> {
        match name {
            "monthly" => Some(RebalanceFrequency::Monthly),
            "quarterly" => Some(RebalanceFrequency::Quarterly),
            "annual" => Some(RebalanceFrequency::Annual),
            _ => None,
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            RebalanceFrequency::Monthly => 1,
            RebalanceFrequency::Quarterly => 3,
            RebalanceFrequency::Annual => 12,
        }
    }

    /// Annualization factor for period-return statistics.
    pub fn periods_per_year(&self) -> f64 {
        12.0 / f64::from(self.months())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub portfolio_size: usize,
    /// Falling-knife guard: momentum raw values at or below this are
    /// excluded from scoring.
    pub momentum_filter: f64,
    pub rebalance: RebalanceFrequency,
    pub factor_config: FactorConfig,
    pub weighting: WeightScheme,
    /// Calendar days of price history fetched behind each evaluation date;
    /// sized to cover the longest momentum horizon with buffer.
    pub history_window_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            portfolio_size: 20,
            momentum_filter: -0.20,
            rebalance: RebalanceFrequency::Quarterly,
            factor_config: FactorConfig::default(),
            weighting: WeightScheme::Equal,
            history_window_days: 550,
        }
    }
}

/// Backtest run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSpan {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub benchmark: String,
    pub risk_free_rate: f64,
}

fn invalid(section: &str, key: &str, reason: &str) -> QuantfolioError {
    QuantfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> QuantfolioError {
    QuantfolioError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn parse_usize_list(section: &str, key: &str, raw: &str) -> Result<Vec<usize>, QuantfolioError> {
    raw.split(',')
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .map_err(|_| invalid(section, key, "expected a comma-separated list of integers"))
        })
        .collect()
}

fn parse_f64_list(section: &str, key: &str, raw: &str) -> Result<Vec<f64>, QuantfolioError> {
    raw.split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| invalid(section, key, "expected a comma-separated list of numbers"))
        })
        .collect()
}

/// Build and validate the engine configuration from the `[engine]` section.
/// Every key has a default; present keys must still be valid.
pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, QuantfolioError> {
    let defaults = EngineConfig::default();

    let portfolio_size = config.get_int("engine", "portfolio_size", defaults.portfolio_size as i64);
    if portfolio_size < 1 {
        return Err(invalid(
            "engine",
            "portfolio_size",
            "portfolio_size must be at least 1",
        ));
    }

    let momentum_filter =
        config.get_double("engine", "momentum_filter", defaults.momentum_filter);
    if !momentum_filter.is_finite() || momentum_filter <= -1.0 {
        return Err(invalid(
            "engine",
            "momentum_filter",
            "momentum_filter must be a return greater than -1.0",
        ));
    }

    let rebalance = match config.get_string("engine", "rebalance") {
        Some(s) => RebalanceFrequency::from_name(s.trim())
            .ok_or_else(|| invalid("engine", "rebalance", "expected monthly, quarterly or annual"))?,
        None => defaults.rebalance,
    };

    let weighting = match config.get_string("engine", "weighting") {
        Some(s) => WeightScheme::from_name(s.trim())
            .ok_or_else(|| invalid("engine", "weighting", "expected equal or score_proportional"))?,
        None => defaults.weighting,
    };

    let volatility_lookback = config.get_int(
        "engine",
        "volatility_lookback",
        defaults.factor_config.volatility_lookback as i64,
    );
    if volatility_lookback < 2 {
        return Err(invalid(
            "engine",
            "volatility_lookback",
            "volatility_lookback must be at least 2 observations",
        ));
    }

    let momentum_legs = match (
        config.get_string("engine", "momentum_horizons"),
        config.get_string("engine", "momentum_weights"),
    ) {
        (None, None) => defaults.factor_config.momentum_legs.clone(),
        (Some(horizons), Some(weights)) => {
            let horizons = parse_usize_list("engine", "momentum_horizons", &horizons)?;
            let weights = parse_f64_list("engine", "momentum_weights", &weights)?;
            if horizons.is_empty() {
                return Err(invalid(
                    "engine",
                    "momentum_horizons",
                    "at least one horizon is required",
                ));
            }
            if horizons.len() != weights.len() {
                return Err(invalid(
                    "engine",
                    "momentum_weights",
                    "momentum_horizons and momentum_weights must have equal length",
                ));
            }
            if horizons.iter().any(|&h| h == 0) {
                return Err(invalid(
                    "engine",
                    "momentum_horizons",
                    "horizons must be positive",
                ));
            }
            if weights.iter().any(|&w| w <= 0.0 || !w.is_finite()) {
                return Err(invalid(
                    "engine",
                    "momentum_weights",
                    "weights must be positive",
                ));
            }
            horizons
                .into_iter()
                .zip(weights)
                .map(|(offset, weight)| MomentumLeg { offset, weight })
                .collect()
        }
        (Some(_), None) => return Err(missing("engine", "momentum_weights")),
        (None, Some(_)) => return Err(missing("engine", "momentum_horizons")),
    };

    let history_window_days = config.get_int(
        "engine",
        "history_window_days",
        defaults.history_window_days,
    );
    let longest_horizon = momentum_legs.iter().map(|l| l.offset).max().unwrap_or(0);
    // Trading-day offsets need roughly 7/5 as many calendar days.
    if history_window_days < (longest_horizon as i64) * 7 / 5 {
        return Err(invalid(
            "engine",
            "history_window_days",
            "history window is too short for the longest momentum horizon",
        ));
    }

    Ok(EngineConfig {
        portfolio_size: portfolio_size as usize,
        momentum_filter,
        rebalance,
        factor_config: FactorConfig {
            momentum_legs,
            volatility_lookback: volatility_lookback as usize,
        },
        weighting,
        history_window_days,
    })
}

/// Build risk profiles from `[engine] profiles` plus one `[profile.<name>]`
/// section per profile. Without the key, the three canonical profiles apply.
pub fn build_profiles(config: &dyn ConfigPort) -> Result<Vec<RiskProfile>, QuantfolioError> {
    let names = match config.get_string("engine", "profiles") {
        Some(s) => s
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>(),
        None => return Ok(default_profiles()),
    };

    if names.is_empty() {
        return Err(invalid("engine", "profiles", "profile list is empty"));
    }

    let mut profiles = Vec::with_capacity(names.len());
    for name in names {
        let section = format!("profile.{name}");
        let keys = config.keys(&section);
        if keys.is_empty() {
            return Err(missing(&section, "factor weights"));
        }

        let mut profile = RiskProfile {
            name: name.clone(),
            weights: Default::default(),
        };
        for key in keys {
            let factor = Factor::from_name(&key)
                .ok_or_else(|| invalid(&section, &key, "unknown factor name"))?;
            let weight = config.get_double(&section, &key, f64::NAN);
            profile.weights.insert(factor, weight);
        }
        profile.validate()?;
        profiles.push(profile);
    }

    Ok(profiles)
}

/// Build and validate the `[backtest]` section.
pub fn build_backtest_span(config: &dyn ConfigPort) -> Result<BacktestSpan, QuantfolioError> {
    let start_str = config
        .get_string("backtest", "start_date")
        .ok_or_else(|| missing("backtest", "start_date"))?;
    let end_str = config
        .get_string("backtest", "end_date")
        .ok_or_else(|| missing("backtest", "end_date"))?;

    let start_date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d")
        .map_err(|_| invalid("backtest", "start_date", "invalid date format (expected YYYY-MM-DD)"))?;
    let end_date = NaiveDate::parse_from_str(&end_str, "%Y-%m-%d")
        .map_err(|_| invalid("backtest", "end_date", "invalid date format (expected YYYY-MM-DD)"))?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let benchmark = match config.get_string("backtest", "benchmark") {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(missing("backtest", "benchmark")),
    };

    let risk_free_rate = config.get_double("backtest", "risk_free_rate", 0.05);
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    Ok(BacktestSpan {
        start_date,
        end_date,
        benchmark,
        risk_free_rate,
    })
}

/// Look up one profile by name among the configured set.
pub fn find_profile<'a>(
    profiles: &'a [RiskProfile],
    name: &str,
) -> Result<&'a RiskProfile, QuantfolioError> {
    profiles
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| QuantfolioError::UnknownProfile {
            name: name.to_string(),
        })
}
