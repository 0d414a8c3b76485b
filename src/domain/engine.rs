//! Factor engine: raw per-instrument factor values and cross-sectional
//! hexile ranks for one evaluation date.
//!
//! Bucket policy: among instruments with a present value, order by goodness
//! (orientation per factor), assign 1-based tie-shared average ranks, then
//! bucket = ceil(rank * 6 / n) clamped to 1..=6. Equal raw values always
//! share a bucket; fewer than six distinct values populate fewer buckets.
//! A missing raw value is forced to bucket 1 regardless of percentile.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;

use super::factor::{Direction, Factor, FactorValue};
use super::fundamentals::FundamentalSnapshot;
use super::price::{sample_std, PriceSeries};

/// One blended-momentum horizon: trailing return over `offset` observations,
/// contributing `weight` to the blend.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumLeg {
    pub offset: usize,
    pub weight: f64,
}

/// Lookback configuration for the price-derived factors.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorConfig {
    pub momentum_legs: Vec<MomentumLeg>,
    pub volatility_lookback: usize,
}

impl Default for FactorConfig {
    fn default() -> Self {
        FactorConfig {
            momentum_legs: vec![
                MomentumLeg {
                    offset: 252,
                    weight: 0.4,
                },
                MomentumLeg {
                    offset: 126,
                    weight: 0.3,
                },
                MomentumLeg {
                    offset: 63,
                    weight: 0.2,
                },
                MomentumLeg {
                    offset: 21,
                    weight: 0.1,
                },
            ],
            volatility_lookback: 252,
        }
    }
}

/// Point-in-time inputs for one instrument: prices at or before the
/// evaluation date and the latest eligible fundamental snapshot.
#[derive(Debug, Clone)]
pub struct InstrumentData {
    pub ticker: String,
    pub prices: PriceSeries,
    pub fundamentals: Option<FundamentalSnapshot>,
}

/// Raw values and hexile buckets for one instrument on one date.
#[derive(Debug, Clone)]
pub struct FactorRow {
    pub ticker: String,
    pub raw: BTreeMap<Factor, FactorValue>,
    pub buckets: BTreeMap<Factor, u8>,
}

impl FactorRow {
    pub fn bucket(&self, factor: Factor) -> u8 {
        self.buckets.get(&factor).copied().unwrap_or(1)
    }

    pub fn raw_value(&self, factor: Factor) -> FactorValue {
        self.raw.get(&factor).copied().unwrap_or(FactorValue::Missing)
    }
}

/// All factor output for one evaluation date, rows sorted by ticker.
#[derive(Debug, Clone)]
pub struct FactorFrame {
    pub date: NaiveDate,
    pub rows: Vec<FactorRow>,
}

impl FactorFrame {
    pub fn row(&self, ticker: &str) -> Option<&FactorRow> {
        self.rows.iter().find(|r| r.ticker == ticker)
    }
}

/// Blended trailing return. Every leg must resolve from available history;
/// a single unresolvable horizon makes the whole value missing.
pub fn momentum_raw(prices: &PriceSeries, legs: &[MomentumLeg]) -> FactorValue {
    let mut blended = 0.0;
    for leg in legs {
        match prices.trailing_return(leg.offset) {
            Some(r) => blended += leg.weight * r,
            None => return FactorValue::Missing,
        }
    }
    FactorValue::from_option(Some(blended))
}

/// Sample standard deviation of trailing daily returns over the lookback
/// window. Missing with fewer than two returns.
pub fn volatility_raw(prices: &PriceSeries, lookback: usize) -> FactorValue {
    let returns = prices.trailing_daily_returns(lookback);
    FactorValue::from_option(sample_std(&returns))
}

fn raw_factors_for(data: &InstrumentData, config: &FactorConfig) -> BTreeMap<Factor, FactorValue> {
    let f = data.fundamentals.as_ref();
    let mut raw = BTreeMap::new();
    raw.insert(
        Factor::PeRatio,
        FactorValue::from_option(f.and_then(|s| s.pe_ratio)),
    );
    raw.insert(
        Factor::PbRatio,
        FactorValue::from_option(f.and_then(|s| s.pb_ratio)),
    );
    raw.insert(Factor::Roe, FactorValue::from_option(f.and_then(|s| s.roe)));
    raw.insert(
        Factor::DebtEquity,
        FactorValue::from_option(f.and_then(|s| s.debt_equity)),
    );
    raw.insert(
        Factor::Momentum,
        momentum_raw(&data.prices, &config.momentum_legs),
    );
    raw.insert(
        Factor::LowVolatility,
        volatility_raw(&data.prices, config.volatility_lookback),
    );
    raw
}

/// Compute raw values for every instrument. The per-instrument work is pure
/// and independent, so it fans out across a rayon pool.
pub fn compute_raw_factors(
    universe: &[InstrumentData],
    config: &FactorConfig,
) -> Vec<(String, BTreeMap<Factor, FactorValue>)> {
    let mut rows: Vec<(String, BTreeMap<Factor, FactorValue>)> = universe
        .par_iter()
        .map(|data| (data.ticker.clone(), raw_factors_for(data, config)))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

/// Assign hexile buckets for one factor across the cross-section.
/// Input and output are keyed by position in `raw_rows`.
fn hexile_buckets(
    raw_rows: &[(String, BTreeMap<Factor, FactorValue>)],
    factor: Factor,
) -> Vec<u8> {
    // (index, goodness): higher goodness is always more favorable.
    let mut present: Vec<(usize, f64)> = raw_rows
        .iter()
        .enumerate()
        .filter_map(|(i, (_, raw))| {
            raw.get(&factor).and_then(|v| v.present()).map(|value| {
                let goodness = match factor.direction() {
                    Direction::HigherIsBetter => value,
                    Direction::LowerIsBetter => -value,
                };
                (i, goodness)
            })
        })
        .collect();

    let mut buckets = vec![1u8; raw_rows.len()];
    let n = present.len();
    if n == 0 {
        return buckets;
    }

    // Worst first; ticker order within ties keeps the sort total.
    present.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| raw_rows[a.0].0.cmp(&raw_rows[b.0].0))
    });

    // Tie-shared average ranks over runs of equal goodness.
    let mut pos = 0;
    while pos < n {
        let mut end = pos + 1;
        while end < n && present[end].1 == present[pos].1 {
            end += 1;
        }
        // 1-based positions pos+1 ..= end average to (pos + end + 1) / 2.
        let avg_rank = (pos + 1 + end) as f64 / 2.0;
        let bucket = ((avg_rank * 6.0 / n as f64).ceil() as u8).clamp(1, 6);
        for item in &present[pos..end] {
            buckets[item.0] = bucket;
        }
        pos = end;
    }

    buckets
}

/// Rank pre-computed raw values into a [`FactorFrame`].
pub fn rank_factors(
    date: NaiveDate,
    raw_rows: Vec<(String, BTreeMap<Factor, FactorValue>)>,
) -> FactorFrame {
    let mut per_factor: BTreeMap<Factor, Vec<u8>> = BTreeMap::new();
    for factor in Factor::ALL {
        per_factor.insert(factor, hexile_buckets(&raw_rows, factor));
    }

    let rows = raw_rows
        .into_iter()
        .enumerate()
        .map(|(i, (ticker, raw))| {
            let buckets = Factor::ALL
                .iter()
                .map(|&f| (f, per_factor[&f][i]))
                .collect();
            FactorRow {
                ticker,
                raw,
                buckets,
            }
        })
        .collect();

    FactorFrame { date, rows }
}

/// Full factor-engine pass: raw values then cross-sectional ranks.
pub fn evaluate(date: NaiveDate, universe: &[InstrumentData], config: &FactorConfig) -> FactorFrame {
    rank_factors(date, compute_raw_factors(universe, config))
}
