//! Backtest simulator: a strictly sequential NAV fold over the replay's
//! portfolio sequence, priced against realized returns, with a benchmark
//! walked in parallel.

use chrono::{Duration, NaiveDate};

use super::error::QuantfolioError;
use super::selection::Portfolio;
use crate::ports::data_port::MarketDataPort;

/// Calendar-day margin fetched behind each period start so a boundary that
/// falls on a non-trading day still resolves to the prior session's close.
const BOUNDARY_LOOKBACK_DAYS: i64 = 10;

/// One point of the NAV series. `period_return` is the portfolio return
/// realized over the period ending at `date` (zero at the starting point).
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub date: NaiveDate,
    pub nav: f64,
    pub benchmark_nav: f64,
    pub period_return: f64,
}

/// Non-fatal pricing gap: a held instrument that could not be priced over a
/// period contributed zero for that period.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationWarning {
    pub date: NaiveDate,
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub profile: String,
    pub results: Vec<BacktestResult>,
    pub warnings: Vec<SimulationWarning>,
}

/// Realized return of one holding over [start, end]: boundary close to
/// boundary close. A name delisted mid-period has no close at the period
/// end, so its last tradable close prices the exit — the survivorship-correct
/// treatment rather than a silent zero-fill.
fn holding_return(
    data: &dyn MarketDataPort,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<f64>, QuantfolioError> {
    let prices = data.price_history(
        ticker,
        start - Duration::days(BOUNDARY_LOOKBACK_DAYS),
        end,
    )?;
    let entry = match prices.close_at_or_before(start) {
        Some(p) if p > 0.0 => p,
        _ => return Ok(None),
    };
    let exit = match prices.last() {
        Some(o) => o.close,
        None => return Ok(None),
    };
    Ok(Some((exit - entry) / entry))
}

/// Benchmark return over [start, end]. Any missing boundary close is fatal:
/// statistics against a silently substituted benchmark would be meaningless.
fn benchmark_return(
    data: &dyn MarketDataPort,
    benchmark: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<f64, QuantfolioError> {
    let prices = data.price_history(
        benchmark,
        start - Duration::days(BOUNDARY_LOOKBACK_DAYS),
        end,
    )?;
    let entry = prices
        .close_at_or_before(start)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| QuantfolioError::BenchmarkGap {
            ticker: benchmark.to_string(),
            date: start,
        })?;
    let exit = prices
        .close_at_or_before(end)
        .ok_or_else(|| QuantfolioError::BenchmarkGap {
            ticker: benchmark.to_string(),
            date: end,
        })?;
    Ok((exit - entry) / entry)
}

/// Walk the portfolio sequence forward: hold each portfolio over its period,
/// compound the weighted realized return into NAV, then replace holdings with
/// the next portfolio (full rebalance). Strictly sequential — each
/// transition's input is the previous transition's output.
pub fn run_simulation(
    data: &dyn MarketDataPort,
    portfolios: &[Portfolio],
    benchmark: &str,
) -> Result<Simulation, QuantfolioError> {
    if portfolios.len() < 2 {
        let (start, end) = match portfolios.first() {
            Some(p) => (p.date, p.date),
            None => (NaiveDate::MIN, NaiveDate::MIN),
        };
        return Err(QuantfolioError::EmptySchedule { start, end });
    }

    let profile = portfolios[0].profile.clone();
    let mut nav = 1.0;
    let mut benchmark_nav = 1.0;
    let mut warnings = Vec::new();

    let mut results = Vec::with_capacity(portfolios.len());
    results.push(BacktestResult {
        date: portfolios[0].date,
        nav,
        benchmark_nav,
        period_return: 0.0,
    });

    for window in portfolios.windows(2) {
        let (held, next) = (&window[0], &window[1]);
        let (start, end) = (held.date, next.date);

        let mut period_return = 0.0;
        for holding in &held.holdings {
            match holding_return(data, &holding.ticker, start, end)? {
                Some(r) => period_return += holding.weight * r,
                None => warnings.push(SimulationWarning {
                    date: start,
                    ticker: holding.ticker.clone(),
                    reason: "no usable price at period boundary; contributed zero".to_string(),
                }),
            }
        }

        let bench_return = benchmark_return(data, benchmark, start, end)?;

        nav *= 1.0 + period_return;
        benchmark_nav *= 1.0 + bench_return;
        results.push(BacktestResult {
            date: end,
            nav,
            benchmark_nav,
            period_return,
        });
    }

    Ok(Simulation {
        profile,
        results,
        warnings,
    })
}
