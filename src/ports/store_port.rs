//! Derived-record persistence port trait.
//!
//! Writes are per-date and idempotent: re-running a date replaces that
//! date's records and touches nothing else, so earlier records are never
//! rewritten by later computations.

use crate::domain::engine::FactorFrame;
use crate::domain::error::QuantfolioError;
use crate::domain::selection::Portfolio;
use crate::domain::simulate::BacktestResult;

pub trait ScoreStorePort {
    /// Persist one date's ranked factor scores, replacing any prior rows for
    /// that date.
    fn save_factor_scores(&self, frame: &FactorFrame) -> Result<(), QuantfolioError>;

    /// Persist one (date, profile) portfolio, replacing any prior rows for
    /// that pair.
    fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), QuantfolioError>;

    /// Persist a profile's backtest NAV series, replacing any prior run for
    /// that profile.
    fn save_backtest_results(
        &self,
        profile: &str,
        results: &[BacktestResult],
    ) -> Result<(), QuantfolioError>;
}
