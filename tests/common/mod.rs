#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

use quantfolio::domain::error::QuantfolioError;
use quantfolio::domain::fundamentals::{latest_at_or_before, FundamentalSnapshot};
use quantfolio::domain::instrument::Instrument;
use quantfolio::domain::price::{PriceObservation, PriceSeries};
use quantfolio::ports::data_port::MarketDataPort;

pub struct MockMarketPort {
    pub instruments: Vec<Instrument>,
    pub prices: HashMap<String, Vec<PriceObservation>>,
    pub fundamentals: HashMap<String, Vec<FundamentalSnapshot>>,
}

impl MockMarketPort {
    pub fn new() -> Self {
        Self {
            instruments: Vec::new(),
            prices: HashMap::new(),
            fundamentals: HashMap::new(),
        }
    }

    pub fn with_instrument(
        mut self,
        ticker: &str,
        listing_start: NaiveDate,
        listing_end: Option<NaiveDate>,
    ) -> Self {
        self.instruments.push(Instrument {
            ticker: ticker.to_string(),
            sector: "Test".to_string(),
            listing_start,
            listing_end,
        });
        self
    }

    pub fn with_closes(mut self, ticker: &str, observations: Vec<PriceObservation>) -> Self {
        self.prices
            .entry(ticker.to_string())
            .or_default()
            .extend(observations);
        self
    }

    pub fn with_fundamentals(mut self, ticker: &str, snapshot: FundamentalSnapshot) -> Self {
        self.fundamentals
            .entry(ticker.to_string())
            .or_default()
            .push(snapshot);
        self
    }
}

impl MarketDataPort for MockMarketPort {
    fn instruments(&self) -> Result<Vec<Instrument>, QuantfolioError> {
        Ok(self.instruments.clone())
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, QuantfolioError> {
        let observations = self
            .prices
            .get(ticker)
            .map(|v| {
                v.iter()
                    .filter(|o| o.date >= start && o.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(PriceSeries::new(observations))
    }

    fn fundamentals_at_or_before(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<Option<FundamentalSnapshot>, QuantfolioError> {
        Ok(self
            .fundamentals
            .get(ticker)
            .and_then(|history| latest_at_or_before(history, date).cloned()))
    }

    fn latest_price_date(&self) -> Result<Option<NaiveDate>, QuantfolioError> {
        Ok(self
            .prices
            .values()
            .flat_map(|v| v.iter().map(|o| o.date))
            .max())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuantfolioError> {
        match self.prices.get(ticker) {
            Some(obs) if !obs.is_empty() => {
                let min = obs.iter().map(|o| o.date).min().unwrap();
                let max = obs.iter().map(|o| o.date).max().unwrap();
                Ok(Some((min, max, obs.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily closes compounding at a constant rate: one observation per calendar
/// day from `start` for `days` days.
pub fn geometric_closes(
    ticker: &str,
    start: NaiveDate,
    days: usize,
    start_price: f64,
    daily_return: f64,
) -> Vec<PriceObservation> {
    (0..days)
        .map(|i| PriceObservation {
            ticker: ticker.to_string(),
            date: start + Duration::days(i as i64),
            close: start_price * (1.0 + daily_return).powi(i as i32),
        })
        .collect()
}

pub fn snapshot(
    ticker: &str,
    d: NaiveDate,
    pe: Option<f64>,
    pb: Option<f64>,
    roe: Option<f64>,
    de: Option<f64>,
) -> FundamentalSnapshot {
    FundamentalSnapshot {
        ticker: ticker.to_string(),
        date: d,
        pe_ratio: pe,
        pb_ratio: pb,
        roe,
        debt_equity: de,
    }
}
