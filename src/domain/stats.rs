//! Summary statistics over a NAV series: CAGR, annualized Sharpe ratio,
//! maximum drawdown.

use chrono::NaiveDate;

use super::simulate::BacktestResult;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub periods: usize,
}

/// Statistics for a (date, NAV) series and its per-period returns.
///
/// CAGR uses calendar years between the first and last date. Sharpe uses the
/// per-period excess return annualized by sqrt(periods per year); a zero
/// return stdev yields a zero ratio rather than a division blowup.
pub fn summarize(
    navs: &[(NaiveDate, f64)],
    period_returns: &[f64],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> SummaryStats {
    let initial = navs.first().map(|&(_, v)| v).unwrap_or(1.0);
    let final_nav = navs.last().map(|&(_, v)| v).unwrap_or(initial);

    let total_return = if initial > 0.0 {
        final_nav / initial - 1.0
    } else {
        0.0
    };

    let years = match (navs.first(), navs.last()) {
        (Some(&(first, _)), Some(&(last, _))) => (last - first).num_days() as f64 / 365.25,
        _ => 0.0,
    };
    let cagr = if years > 0.0 && initial > 0.0 && final_nav > 0.0 {
        (final_nav / initial).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let sharpe_ratio = compute_sharpe(period_returns, risk_free_rate, periods_per_year);
    let max_drawdown = compute_drawdown(navs);

    SummaryStats {
        total_return,
        cagr,
        sharpe_ratio,
        max_drawdown,
        periods: period_returns.len(),
    }
}

/// Strategy-side stats straight from a simulation's result series.
pub fn strategy_stats(
    results: &[BacktestResult],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> SummaryStats {
    let navs: Vec<(NaiveDate, f64)> = results.iter().map(|r| (r.date, r.nav)).collect();
    let returns: Vec<f64> = results.iter().skip(1).map(|r| r.period_return).collect();
    summarize(&navs, &returns, risk_free_rate, periods_per_year)
}

/// Benchmark-side stats from the same series; period returns are derived
/// from consecutive benchmark NAV points.
pub fn benchmark_stats(
    results: &[BacktestResult],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> SummaryStats {
    let navs: Vec<(NaiveDate, f64)> = results.iter().map(|r| (r.date, r.benchmark_nav)).collect();
    let returns: Vec<f64> = navs
        .windows(2)
        .map(|w| {
            let (prev, curr) = (w[0].1, w[1].1);
            if prev > 0.0 { curr / prev - 1.0 } else { 0.0 }
        })
        .collect();
    summarize(&navs, &returns, risk_free_rate, periods_per_year)
}

fn compute_sharpe(period_returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if period_returns.len() < 2 {
        return 0.0;
    }
    let n = period_returns.len() as f64;
    let period_rf = risk_free_rate / periods_per_year;
    let mean = period_returns.iter().sum::<f64>() / n;
    let variance = period_returns
        .iter()
        .map(|r| (r - mean) * (r - mean))
        .sum::<f64>()
        / (n - 1.0);
    let stddev = variance.sqrt();
    if stddev > 0.0 {
        ((mean - period_rf) / stddev) * periods_per_year.sqrt()
    } else {
        0.0
    }
}

/// Peak-to-trough decline over the NAV walk, as a positive fraction.
fn compute_drawdown(navs: &[(NaiveDate, f64)]) -> f64 {
    let mut peak = match navs.first() {
        Some(&(_, v)) => v,
        None => return 0.0,
    };
    let mut max_dd = 0.0_f64;
    for &(_, nav) in navs {
        if nav > peak {
            peak = nav;
        } else if peak > 0.0 {
            let dd = (peak - nav) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}
