//! Market-data access port trait.
//!
//! All methods are reads; the engine treats the underlying store as an
//! immutable snapshot for the duration of one computation.

use chrono::NaiveDate;

use crate::domain::error::QuantfolioError;
use crate::domain::fundamentals::FundamentalSnapshot;
use crate::domain::instrument::Instrument;
use crate::domain::price::PriceSeries;

pub trait MarketDataPort {
    /// The full instrument reference table (universe definition).
    fn instruments(&self) -> Result<Vec<Instrument>, QuantfolioError>;

    /// Close series for one ticker within [start, end], sorted ascending.
    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, QuantfolioError>;

    /// Latest fundamental snapshot dated at or before `date`. A snapshot
    /// dated after `date` must never be returned (look-ahead).
    fn fundamentals_at_or_before(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<Option<FundamentalSnapshot>, QuantfolioError>;

    /// Most recent price date across all instruments, if any data exists.
    /// Used as the evaluation date for the live portfolio path.
    fn latest_price_date(&self) -> Result<Option<NaiveDate>, QuantfolioError>;

    /// (first date, last date, observation count) for one ticker.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuantfolioError>;
}
