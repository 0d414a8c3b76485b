//! Historical replay: run the factor → score → select chain once per
//! rebalance date, using only data available at or before each date.

use chrono::{Datelike, Duration, NaiveDate};

use super::engine::{self, FactorFrame, InstrumentData};
use super::engine_config::{EngineConfig, RebalanceFrequency};
use super::error::QuantfolioError;
use super::instrument::{members_at, Instrument};
use super::scoring::{composite_scores, RiskProfile};
use super::selection::{select_portfolio, Portfolio};
use crate::ports::data_port::MarketDataPort;

/// Period-first rebalance dates within [start, end].
///
/// Dates are calendar period firsts (1 Jan, 1 Apr, ... for quarterly); all
/// reads are at-or-before, so a non-trading first resolves to the prior
/// session exactly as a business-day schedule would.
pub fn rebalance_schedule(
    start: NaiveDate,
    end: NaiveDate,
    frequency: RebalanceFrequency,
) -> Vec<NaiveDate> {
    let step = frequency.months();
    let mut year = start.year();
    let mut month = start.month();

    // Round up to the next period boundary unless start is exactly one.
    let offset = (month - 1) % step;
    if offset != 0 || start.day() > 1 {
        month = month - offset + step;
        if month > 12 {
            month -= 12;
            year += 1;
        }
    }

    let mut dates = Vec::new();
    loop {
        let date = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(d) => d,
            None => break,
        };
        if date > end {
            break;
        }
        dates.push(date);
        month += step;
        if month > 12 {
            month -= 12;
            year += 1;
        }
    }
    dates
}

/// One rebalance date's complete output: the factor frame and one portfolio
/// per risk profile.
#[derive(Debug, Clone)]
pub struct ReplaySnapshot {
    pub date: NaiveDate,
    pub frame: FactorFrame,
    pub portfolios: Vec<Portfolio>,
}

impl ReplaySnapshot {
    pub fn portfolio_for(&self, profile: &str) -> Option<&Portfolio> {
        self.portfolios.iter().find(|p| p.profile == profile)
    }
}

/// Progress report passed to the caller after each completed date. The
/// callback runs between dates, which makes it a safe external cancellation
/// point: no partial date is ever observable.
#[derive(Debug, Clone, Copy)]
pub struct ReplayProgress {
    pub index: usize,
    pub total: usize,
    pub date: NaiveDate,
}

/// Gather point-in-time inputs for every member of the universe at `date`.
fn universe_data_at(
    data: &dyn MarketDataPort,
    members: &[&Instrument],
    date: NaiveDate,
    history_window_days: i64,
) -> Result<Vec<InstrumentData>, QuantfolioError> {
    let window_start = date - Duration::days(history_window_days);
    members
        .iter()
        .map(|instrument| {
            let prices = data.price_history(&instrument.ticker, window_start, date)?;
            let fundamentals = data.fundamentals_at_or_before(&instrument.ticker, date)?;
            Ok(InstrumentData {
                ticker: instrument.ticker.clone(),
                prices,
                fundamentals,
            })
        })
        .collect()
}

/// Run the chain once for a single evaluation date. This is also the live
/// path: the current portfolio is just a replay of the latest date.
pub fn evaluate_date(
    data: &dyn MarketDataPort,
    universe: &[Instrument],
    date: NaiveDate,
    config: &EngineConfig,
    profiles: &[RiskProfile],
) -> Result<ReplaySnapshot, QuantfolioError> {
    let members = members_at(universe, date);
    let inputs = universe_data_at(data, &members, date, config.history_window_days)?;
    let frame = engine::evaluate(date, &inputs, &config.factor_config);

    let portfolios = profiles
        .iter()
        .map(|profile| {
            let scores = composite_scores(&frame, profile, config.momentum_filter);
            select_portfolio(
                date,
                &profile.name,
                scores,
                config.portfolio_size,
                config.weighting,
            )
        })
        .collect();

    Ok(ReplaySnapshot {
        date,
        frame,
        portfolios,
    })
}

/// Replay the full chain across a date range.
///
/// Dates advance strictly in order; per-instrument factor math inside each
/// date fans out across the rayon pool. Each date reads only data at or
/// before itself and writes a disjoint snapshot, so a later date can never
/// rewrite an earlier one.
pub fn run_replay(
    data: &dyn MarketDataPort,
    config: &EngineConfig,
    profiles: &[RiskProfile],
    start: NaiveDate,
    end: NaiveDate,
    mut progress: impl FnMut(ReplayProgress),
) -> Result<Vec<ReplaySnapshot>, QuantfolioError> {
    let schedule = rebalance_schedule(start, end, config.rebalance);
    if schedule.is_empty() {
        return Err(QuantfolioError::EmptySchedule { start, end });
    }

    let universe = data.instruments()?;
    let total = schedule.len();

    let mut snapshots = Vec::with_capacity(total);
    for (index, &date) in schedule.iter().enumerate() {
        let snapshot = evaluate_date(data, &universe, date, config, profiles)?;
        progress(ReplayProgress { index, total, date });
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarterly_schedule_from_quarter_start() {
        let dates = rebalance_schedule(
            date(2020, 1, 1),
            date(2020, 12, 31),
            RebalanceFrequency::Quarterly,
        );
        assert_eq!(
            dates,
            vec![
                date(2020, 1, 1),
                date(2020, 4, 1),
                date(2020, 7, 1),
                date(2020, 10, 1),
            ]
        );
    }

    #[test]
    fn quarterly_schedule_rounds_up_mid_quarter_start() {
        let dates = rebalance_schedule(
            date(2020, 2, 15),
            date(2020, 12, 31),
            RebalanceFrequency::Quarterly,
        );
        assert_eq!(dates[0], date(2020, 4, 1));
    }

    #[test]
    fn quarterly_schedule_rounds_up_from_second_day() {
        let dates = rebalance_schedule(
            date(2020, 1, 2),
            date(2020, 12, 31),
            RebalanceFrequency::Quarterly,
        );
        assert_eq!(dates[0], date(2020, 4, 1));
    }

    #[test]
    fn quarterly_schedule_rolls_year_end() {
        let dates = rebalance_schedule(
            date(2020, 11, 5),
            date(2021, 6, 30),
            RebalanceFrequency::Quarterly,
        );
        assert_eq!(dates, vec![date(2021, 1, 1), date(2021, 4, 1)]);
    }

    #[test]
    fn monthly_schedule() {
        let dates = rebalance_schedule(
            date(2024, 1, 1),
            date(2024, 3, 31),
            RebalanceFrequency::Monthly,
        );
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]
        );
    }

    #[test]
    fn annual_schedule() {
        let dates = rebalance_schedule(
            date(2020, 3, 1),
            date(2023, 12, 31),
            RebalanceFrequency::Annual,
        );
        assert_eq!(
            dates,
            vec![date(2021, 1, 1), date(2022, 1, 1), date(2023, 1, 1)]
        );
    }

    #[test]
    fn empty_schedule_when_range_has_no_boundary() {
        let dates = rebalance_schedule(
            date(2020, 1, 15),
            date(2020, 2, 20),
            RebalanceFrequency::Quarterly,
        );
        assert!(dates.is_empty());
    }
}
