//! Portfolio selection: top-K by composite score with pluggable weighting.

use chrono::NaiveDate;

use super::scoring::CompositeScore;

/// How the selected names are weighted. Selection order is fixed (score
/// descending, ticker ascending on ties); schemes only decide the weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightScheme {
    Equal,
    ScoreProportional,
}

impl WeightScheme {
    pub fn name(&self) -> &'static str {
        match self {
            WeightScheme::Equal => "equal",
            WeightScheme::ScoreProportional => "score_proportional",
        }
    }

    pub fn from_name(name: &str) -> Option<WeightScheme> {
        match name {
            "equal" => Some(WeightScheme::Equal),
            "score_proportional" => Some(WeightScheme::ScoreProportional),
            _ => None,
        }
    }

    fn weights(&self, selected: &[CompositeScore]) -> Vec<f64> {
        let k = selected.len();
        match self {
            WeightScheme::Equal => vec![1.0 / k as f64; k],
            WeightScheme::ScoreProportional => {
                let total: f64 = selected.iter().map(|s| s.score).sum();
                if total <= 0.0 {
                    // Degenerate all-zero scores fall back to equal weight.
                    vec![1.0 / k as f64; k]
                } else {
                    selected.iter().map(|s| s.score / total).collect()
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub weight: f64,
    pub score: f64,
}

/// One rebalance date's book for one profile. Created whole, superseded by
/// the next rebalance, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub date: NaiveDate,
    pub profile: String,
    pub holdings: Vec<Holding>,
    /// The configured K. `holdings.len() < requested_size` means fewer
    /// candidates survived the momentum filter than requested.
    pub requested_size: usize,
}

impl Portfolio {
    pub fn is_degraded(&self) -> bool {
        self.holdings.len() < self.requested_size
    }

    pub fn weight_of(&self, ticker: &str) -> Option<f64> {
        self.holdings
            .iter()
            .find(|h| h.ticker == ticker)
            .map(|h| h.weight)
    }
}

/// Select the top `k` candidates by score and assign weights.
///
/// With fewer than `k` survivors the portfolio is returned smaller, never
/// padded; the shortfall stays observable through `requested_size`.
pub fn select_portfolio(
    date: NaiveDate,
    profile: &str,
    mut candidates: Vec<CompositeScore>,
    k: usize,
    scheme: WeightScheme,
) -> Portfolio {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    candidates.truncate(k);

    let holdings = if candidates.is_empty() {
        Vec::new()
    } else {
        let weights = scheme.weights(&candidates);
        candidates
            .into_iter()
            .zip(weights)
            .map(|(c, weight)| Holding {
                ticker: c.ticker,
                weight,
                score: c.score,
            })
            .collect()
    };

    Portfolio {
        date,
        profile: profile.to_string(),
        holdings,
        requested_size: k,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn score(ticker: &str, value: f64) -> CompositeScore {
        CompositeScore {
            ticker: ticker.to_string(),
            date: date(),
            profile: "balanced".to_string(),
            score: value,
        }
    }

    #[test]
    fn selects_top_k_by_score() {
        let candidates = vec![
            score("A", 3.0),
            score("B", 5.5),
            score("C", 4.0),
            score("D", 1.0),
        ];
        let p = select_portfolio(date(), "balanced", candidates, 2, WeightScheme::Equal);
        let tickers: Vec<&str> = p.holdings.iter().map(|h| h.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["B", "C"]);
        assert!(!p.is_degraded());
    }

    #[test]
    fn equal_weights_sum_to_one() {
        let candidates = vec![score("A", 3.0), score("B", 2.0), score("C", 1.0)];
        let p = select_portfolio(date(), "balanced", candidates, 3, WeightScheme::Equal);
        let total: f64 = p.holdings.iter().map(|h| h.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
        for h in &p.holdings {
            assert!((h.weight - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn score_proportional_weights() {
        let candidates = vec![score("A", 6.0), score("B", 2.0)];
        let p = select_portfolio(
            date(),
            "balanced",
            candidates,
            2,
            WeightScheme::ScoreProportional,
        );
        assert!((p.weight_of("A").unwrap() - 0.75).abs() < 1e-12);
        assert!((p.weight_of("B").unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn tie_break_is_ticker_ascending() {
        let candidates = vec![score("ZEE", 4.0), score("ACC", 4.0), score("ITC", 4.0)];
        let p = select_portfolio(date(), "balanced", candidates, 2, WeightScheme::Equal);
        let tickers: Vec<&str> = p.holdings.iter().map(|h| h.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["ACC", "ITC"]);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let candidates = || {
            vec![
                score("A", 4.0),
                score("B", 4.0),
                score("C", 2.0),
                score("D", 5.0),
            ]
        };
        let p1 = select_portfolio(date(), "balanced", candidates(), 3, WeightScheme::Equal);
        let p2 = select_portfolio(date(), "balanced", candidates(), 3, WeightScheme::Equal);
        assert_eq!(p1, p2);
    }

    #[test]
    fn shortfall_returns_smaller_portfolio() {
        let candidates = vec![score("A", 4.0)];
        let p = select_portfolio(date(), "balanced", candidates, 20, WeightScheme::Equal);
        assert_eq!(p.holdings.len(), 1);
        assert_eq!(p.requested_size, 20);
        assert!(p.is_degraded());
        assert!((p.holdings[0].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_candidates_yield_empty_portfolio() {
        let p = select_portfolio(date(), "balanced", Vec::new(), 5, WeightScheme::Equal);
        assert!(p.holdings.is_empty());
        assert!(p.is_degraded());
    }
}
