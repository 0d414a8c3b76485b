//! Report output port trait.

use crate::domain::selection::Portfolio;
use crate::domain::simulate::BacktestResult;
use crate::domain::stats::SummaryStats;
use crate::domain::error::QuantfolioError;

pub trait ReportPort {
    /// Render a backtest run: the NAV series plus strategy and benchmark
    /// summary statistics.
    fn write_backtest(
        &self,
        profile: &str,
        results: &[BacktestResult],
        strategy: &SummaryStats,
        benchmark: &SummaryStats,
    ) -> Result<(), QuantfolioError>;

    /// Render one portfolio's ranked holding list.
    fn write_portfolio(&self, portfolio: &Portfolio) -> Result<(), QuantfolioError>;
}
