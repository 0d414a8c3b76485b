//! Instrument reference data and universe membership.
//!
//! An instrument is in the universe at a given date when it had started
//! trading on or before that date and was not yet delisted. Names that fail
//! this window are excluded before any factor work happens, so a ticker that
//! did not exist at an earlier rebalance date can never leak into that
//! date's portfolio.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub ticker: String,
    pub sector: String,
    pub listing_start: NaiveDate,
    pub listing_end: Option<NaiveDate>,
}

impl Instrument {
    /// True when the instrument was tradable at `date`.
    pub fn listed_on(&self, date: NaiveDate) -> bool {
        if self.listing_start > date {
            return false;
        }
        match self.listing_end {
            Some(end) => end > date,
            None => true,
        }
    }
}

/// Restrict a universe to the instruments tradable at `date`.
///
/// Exclusions are expected and frequent (UniverseGap); callers that want
/// visibility can diff the input and output lengths.
pub fn members_at<'a>(universe: &'a [Instrument], date: NaiveDate) -> Vec<&'a Instrument> {
    universe.iter().filter(|i| i.listed_on(date)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(ticker: &str, start: (i32, u32, u32), end: Option<(i32, u32, u32)>) -> Instrument {
        Instrument {
            ticker: ticker.to_string(),
            sector: "Financials".to_string(),
            listing_start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            listing_end: end.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn listed_within_window() {
        let i = inst("HDFC", (2015, 1, 1), None);
        assert!(i.listed_on(date(2020, 6, 1)));
        assert!(i.listed_on(date(2015, 1, 1)));
    }

    #[test]
    fn not_listed_before_start() {
        let i = inst("ZOMATO", (2021, 7, 23), None);
        assert!(!i.listed_on(date(2020, 1, 1)));
    }

    #[test]
    fn delisted_names_drop_out() {
        let i = inst("OLD", (2010, 1, 1), Some((2022, 3, 15)));
        assert!(i.listed_on(date(2022, 3, 14)));
        // Delisting date itself is no longer tradable.
        assert!(!i.listed_on(date(2022, 3, 15)));
        assert!(!i.listed_on(date(2023, 1, 1)));
    }

    #[test]
    fn members_at_filters_both_ends() {
        let universe = vec![
            inst("A", (2010, 1, 1), None),
            inst("B", (2021, 1, 1), None),
            inst("C", (2010, 1, 1), Some((2019, 6, 1))),
        ];
        let members = members_at(&universe, date(2020, 1, 1));
        let tickers: Vec<&str> = members.iter().map(|i| i.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["A"]);
    }
}
