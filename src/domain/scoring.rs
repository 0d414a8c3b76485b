//! Composite scoring: risk-profile weight vectors over hexile buckets, with
//! the falling-knife momentum pre-filter.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::engine::FactorFrame;
use super::error::QuantfolioError;
use super::factor::Factor;

/// A named factor-tilt: non-negative weight per factor. Weights need not sum
/// to one; the composite normalizes by the weight total.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskProfile {
    pub name: String,
    pub weights: BTreeMap<Factor, f64>,
}

impl RiskProfile {
    pub fn new(name: &str, weights: &[(Factor, f64)]) -> Self {
        RiskProfile {
            name: name.to_string(),
            weights: weights.iter().copied().collect(),
        }
    }

    /// Reject negative weights and all-zero vectors. Unknown factor names are
    /// rejected earlier, at parse time, since [`Factor::from_name`] gates the
    /// config surface.
    pub fn validate(&self) -> Result<(), QuantfolioError> {
        let mut total = 0.0;
        for (factor, &weight) in &self.weights {
            if weight < 0.0 || !weight.is_finite() {
                return Err(QuantfolioError::ConfigInvalid {
                    section: format!("profile.{}", self.name),
                    key: factor.name().to_string(),
                    reason: "factor weight must be a non-negative number".to_string(),
                });
            }
            total += weight;
        }
        if total <= 0.0 {
            return Err(QuantfolioError::ConfigInvalid {
                section: format!("profile.{}", self.name),
                key: "weights".to_string(),
                reason: "at least one factor weight must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// The three canonical tilts. The conservative book leans on quality and low
/// volatility, the aggressive book on value and momentum. These are defaults;
/// config-defined profiles replace or extend them without code changes.
pub fn default_profiles() -> Vec<RiskProfile> {
    vec![
        RiskProfile::new(
            "conservative",
            &[
                (Factor::PeRatio, 0.075),
                (Factor::PbRatio, 0.075),
                (Factor::Roe, 0.20),
                (Factor::DebtEquity, 0.20),
                (Factor::Momentum, 0.05),
                (Factor::LowVolatility, 0.40),
            ],
        ),
        RiskProfile::new(
            "balanced",
            &[
                (Factor::PeRatio, 0.125),
                (Factor::PbRatio, 0.125),
                (Factor::Roe, 0.125),
                (Factor::DebtEquity, 0.125),
                (Factor::Momentum, 0.25),
                (Factor::LowVolatility, 0.25),
            ],
        ),
        RiskProfile::new(
            "aggressive",
            &[
                (Factor::PeRatio, 0.20),
                (Factor::PbRatio, 0.20),
                (Factor::Roe, 0.075),
                (Factor::DebtEquity, 0.075),
                (Factor::Momentum, 0.40),
                (Factor::LowVolatility, 0.05),
            ],
        ),
    ]
}

/// Composite score for one instrument on one date under one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub ticker: String,
    pub date: NaiveDate,
    pub profile: String,
    pub score: f64,
}

/// Score a date's factor frame under a profile.
///
/// The falling-knife guard is a pre-filter, not a penalty: an instrument
/// whose momentum raw value is missing or at or below `momentum_filter`
/// never enters the candidate list, whatever its other buckets say.
pub fn composite_scores(
    frame: &FactorFrame,
    profile: &RiskProfile,
    momentum_filter: f64,
) -> Vec<CompositeScore> {
    let weight_total: f64 = profile.weights.values().sum();

    frame
        .rows
        .iter()
        .filter(|row| {
            match row.raw_value(Factor::Momentum).present() {
                Some(raw) => raw > momentum_filter,
                None => false,
            }
        })
        .map(|row| {
            let weighted: f64 = profile
                .weights
                .iter()
                .map(|(&factor, &weight)| weight * f64::from(row.bucket(factor)))
                .sum();
            CompositeScore {
                ticker: row.ticker.clone(),
                date: frame.date,
                profile: profile.name.clone(),
                score: weighted / weight_total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::rank_factors;
    use crate::domain::factor::FactorValue;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn frame_with(rows: Vec<(&str, Vec<(Factor, Option<f64>)>)>) -> FactorFrame {
        let raw_rows = rows
            .into_iter()
            .map(|(ticker, values)| {
                let raw: BTreeMap<Factor, FactorValue> = values
                    .into_iter()
                    .map(|(f, v)| (f, FactorValue::from_option(v)))
                    .collect();
                (ticker.to_string(), raw)
            })
            .collect();
        rank_factors(date(), raw_rows)
    }

    fn pe_only_profile() -> RiskProfile {
        RiskProfile::new("pe_only", &[(Factor::PeRatio, 1.0)])
    }

    #[test]
    fn cheap_stock_outranks_expensive_on_pe_profile() {
        let frame = frame_with(vec![
            (
                "A",
                vec![(Factor::PeRatio, Some(10.0)), (Factor::Momentum, Some(0.10))],
            ),
            (
                "B",
                vec![(Factor::PeRatio, Some(30.0)), (Factor::Momentum, Some(0.10))],
            ),
        ]);
        let scores = composite_scores(&frame, &pe_only_profile(), -0.20);
        let a = scores.iter().find(|s| s.ticker == "A").unwrap();
        let b = scores.iter().find(|s| s.ticker == "B").unwrap();
        assert!(a.score > b.score);
    }

    #[test]
    fn score_is_weight_normalized_bucket_mean() {
        let profile = RiskProfile::new(
            "two_factor",
            &[(Factor::PeRatio, 2.0), (Factor::Roe, 2.0)],
        );
        let frame = frame_with(vec![(
            "A",
            vec![
                (Factor::PeRatio, Some(10.0)),
                (Factor::Roe, Some(0.2)),
                (Factor::Momentum, Some(0.0)),
            ],
        )]);
        let scores = composite_scores(&frame, &profile, -0.20);
        // Sole present value in each factor ranks bucket 6.
        assert!((scores[0].score - 6.0).abs() < 1e-12);
    }

    #[test]
    fn falling_knife_excluded_despite_strong_factors() {
        let frame = frame_with(vec![
            (
                "C",
                vec![
                    (Factor::PeRatio, Some(5.0)),
                    (Factor::Momentum, Some(-0.35)),
                ],
            ),
            (
                "D",
                vec![
                    (Factor::PeRatio, Some(40.0)),
                    (Factor::Momentum, Some(0.05)),
                ],
            ),
        ]);
        let scores = composite_scores(&frame, &pe_only_profile(), -0.20);
        assert!(scores.iter().all(|s| s.ticker != "C"));
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let frame = frame_with(vec![(
            "E",
            vec![(Factor::PeRatio, Some(10.0)), (Factor::Momentum, Some(-0.20))],
        )]);
        let scores = composite_scores(&frame, &pe_only_profile(), -0.20);
        assert!(scores.is_empty());
    }

    #[test]
    fn missing_momentum_excluded() {
        let frame = frame_with(vec![(
            "F",
            vec![(Factor::PeRatio, Some(10.0)), (Factor::Momentum, None)],
        )]);
        let scores = composite_scores(&frame, &pe_only_profile(), -0.20);
        assert!(scores.is_empty());
    }

    #[test]
    fn raising_a_weight_preserves_factor_dominance() {
        // A beats B on P/E and ties elsewhere; more P/E weight can only help A.
        let rows = vec![
            (
                "A",
                vec![
                    (Factor::PeRatio, Some(8.0)),
                    (Factor::Roe, Some(0.1)),
                    (Factor::Momentum, Some(0.05)),
                ],
            ),
            (
                "B",
                vec![
                    (Factor::PeRatio, Some(30.0)),
                    (Factor::Roe, Some(0.1)),
                    (Factor::Momentum, Some(0.05)),
                ],
            ),
        ];
        for pe_weight in [0.1, 0.5, 1.0, 3.0] {
            let profile = RiskProfile::new(
                "tilt",
                &[(Factor::PeRatio, pe_weight), (Factor::Roe, 0.5)],
            );
            let frame = frame_with(rows.clone());
            let scores = composite_scores(&frame, &profile, -0.20);
            let a = scores.iter().find(|s| s.ticker == "A").unwrap().score;
            let b = scores.iter().find(|s| s.ticker == "B").unwrap().score;
            assert!(a >= b, "pe_weight {pe_weight}: {a} < {b}");
        }
    }

    #[test]
    fn default_profiles_validate() {
        for profile in default_profiles() {
            assert!(profile.validate().is_ok(), "{}", profile.name);
        }
    }

    #[test]
    fn negative_weight_rejected() {
        let profile = RiskProfile::new("bad", &[(Factor::PeRatio, -0.1)]);
        let err = profile.validate().unwrap_err();
        assert!(matches!(
            err,
            QuantfolioError::ConfigInvalid { key, .. } if key == "pe_ratio"
        ));
    }

    #[test]
    fn all_zero_weights_rejected() {
        let profile = RiskProfile::new("zero", &[(Factor::PeRatio, 0.0)]);
        assert!(profile.validate().is_err());
    }
}
