//! Adjusted-close price series and return arithmetic.
//!
//! Offsets are in trading days (observation count), not calendar days, so a
//! 21-observation offset is "one month ago" regardless of holidays.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
}

/// A per-instrument close series, sorted by date ascending.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(mut observations: Vec<PriceObservation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    /// Latest close at or before `date`.
    pub fn close_at_or_before(&self, date: NaiveDate) -> Option<f64> {
        self.observations
            .iter()
            .rev()
            .find(|o| o.date <= date)
            .map(|o| o.close)
    }

    /// Return over the trailing `offset` observations, measured from the
    /// final observation: (last - close[len-1-offset]) / close[len-1-offset].
    ///
    /// None when the series is too short or the reference close is zero.
    pub fn trailing_return(&self, offset: usize) -> Option<f64> {
        let n = self.observations.len();
        if n == 0 || n <= offset {
            return None;
        }
        let past = self.observations[n - 1 - offset].close;
        let last = self.observations[n - 1].close;
        if past == 0.0 {
            return None;
        }
        Some((last - past) / past)
    }

    /// Day-over-day returns for the trailing `window` observations (at most
    /// `window` returns; fewer when the series is shorter).
    pub fn trailing_daily_returns(&self, window: usize) -> Vec<f64> {
        let n = self.observations.len();
        if n < 2 {
            return Vec::new();
        }
        let start = n.saturating_sub(window + 1);
        self.observations[start..]
            .windows(2)
            .filter_map(|w| {
                let prev = w[0].close;
                if prev == 0.0 {
                    None
                } else {
                    Some((w[1].close - prev) / prev)
                }
            })
            .collect()
    }

}

/// Sample standard deviation (n - 1 denominator). None for fewer than two
/// values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n as f64 - 1.0);
    Some(variance.sqrt())
}
