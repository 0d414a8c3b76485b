//! Property tests: bucket-range and NAV-compounding invariants.

mod common;

use common::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

use quantfolio::domain::engine::rank_factors;
use quantfolio::domain::factor::{Factor, FactorValue};
use quantfolio::domain::price::PriceObservation;
use quantfolio::domain::selection::{Holding, Portfolio};
use quantfolio::domain::simulate::run_simulation;

fn quarter_dates(n: usize) -> Vec<chrono::NaiveDate> {
    (0..n)
        .map(|i| {
            let months = i as u32 * 3;
            date(2020 + (months / 12) as i32, months % 12 + 1, 1)
        })
        .collect()
}

proptest! {
    /// Every bucket lands in 1..=6 and every missing value lands exactly on 1,
    /// for any mix of present and missing raw values.
    #[test]
    fn buckets_stay_in_range(values in proptest::collection::vec(
        proptest::option::of(-1e6..1e6f64), 1..60,
    )) {
        let raw_rows: Vec<(String, BTreeMap<Factor, FactorValue>)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut raw = BTreeMap::new();
                raw.insert(Factor::Momentum, FactorValue::from_option(*v));
                (format!("T{i:03}"), raw)
            })
            .collect();

        let frame = rank_factors(date(2024, 1, 1), raw_rows);
        for (row, value) in frame.rows.iter().zip(&values) {
            let bucket = row.bucket(Factor::Momentum);
            prop_assert!((1..=6).contains(&bucket));
            if value.is_none() {
                prop_assert_eq!(bucket, 1);
            }
        }
    }

    /// Identical raw values always share a bucket.
    #[test]
    fn ties_never_split(value in -1e3..1e3f64, n in 2usize..40) {
        let raw_rows: Vec<(String, BTreeMap<Factor, FactorValue>)> = (0..n)
            .map(|i| {
                let mut raw = BTreeMap::new();
                raw.insert(Factor::Roe, FactorValue::Present(value));
                (format!("T{i:03}"), raw)
            })
            .collect();

        let frame = rank_factors(date(2024, 1, 1), raw_rows);
        let first = frame.rows[0].bucket(Factor::Roe);
        for row in &frame.rows {
            prop_assert_eq!(row.bucket(Factor::Roe), first);
        }
    }

    /// NAV stays positive for any per-period return above -100%, and the
    /// final NAV is exactly the compounded product of (1 + return).
    #[test]
    fn nav_round_trips_compounding(returns in proptest::collection::vec(
        -0.95..1.0f64, 1..8,
    )) {
        let dates = quarter_dates(returns.len() + 1);

        let mut close = 100.0;
        let mut closes = vec![PriceObservation {
            ticker: "AAA".into(),
            date: dates[0],
            close,
        }];
        for (i, r) in returns.iter().enumerate() {
            close *= 1.0 + r;
            closes.push(PriceObservation {
                ticker: "AAA".into(),
                date: dates[i + 1],
                close,
            });
        }

        let bench: Vec<PriceObservation> = dates
            .iter()
            .map(|&d| PriceObservation {
                ticker: "BENCH".into(),
                date: d,
                close: 100.0,
            })
            .collect();

        let port = MockMarketPort::new()
            .with_closes("AAA", closes)
            .with_closes("BENCH", bench);

        let portfolios: Vec<Portfolio> = dates
            .iter()
            .map(|&d| Portfolio {
                date: d,
                profile: "test".into(),
                holdings: vec![Holding {
                    ticker: "AAA".into(),
                    weight: 1.0,
                    score: 0.0,
                }],
                requested_size: 1,
            })
            .collect();

        let sim = run_simulation(&port, &portfolios, "BENCH").unwrap();
        let expected: f64 = returns.iter().map(|r| 1.0 + r).product();
        let final_nav = sim.results.last().unwrap().nav;

        prop_assert!(final_nav > 0.0);
        prop_assert!((final_nav - expected).abs() < 1e-9 * expected.max(1.0));
    }
}
