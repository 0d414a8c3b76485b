//! CSV ingestion: universe definition, price history, and fundamental
//! snapshots. Column order is fixed; the first row is a header.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;

use crate::domain::error::QuantfolioError;
use crate::domain::fundamentals::FundamentalSnapshot;
use crate::domain::instrument::Instrument;
use crate::domain::price::PriceObservation;

fn read_err(reason: String) -> QuantfolioError {
    QuantfolioError::Database { reason }
}

fn get_field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'a str, QuantfolioError> {
    record
        .get(index)
        .ok_or_else(|| read_err(format!("missing {name} column")))
}

fn parse_field_date(raw: &str, name: &str) -> Result<NaiveDate, QuantfolioError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| read_err(format!("invalid {name} value {raw:?}: {e}")))
}

fn parse_optional_f64(raw: &str, name: &str) -> Result<Option<f64>, QuantfolioError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|e| read_err(format!("invalid {name} value {raw:?}: {e}")))
}

fn read_content(path: &Path) -> Result<String, QuantfolioError> {
    fs::read_to_string(path)
        .map_err(|e| read_err(format!("failed to read {}: {}", path.display(), e)))
}

/// `ticker,sector,listing_start,listing_end` — listing_end blank for names
/// still trading.
pub fn read_universe(path: &Path) -> Result<Vec<Instrument>, QuantfolioError> {
    let content = read_content(path)?;
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut instruments = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| read_err(format!("CSV parse error: {e}")))?;

        let ticker = get_field(&record, 0, "ticker")?.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(read_err("empty ticker in universe file".into()));
        }
        let sector = get_field(&record, 1, "sector")?.trim().to_string();
        let listing_start =
            parse_field_date(get_field(&record, 2, "listing_start")?, "listing_start")?;
        let listing_end_raw = record.get(3).unwrap_or("").trim();
        let listing_end = if listing_end_raw.is_empty() {
            None
        } else {
            Some(parse_field_date(listing_end_raw, "listing_end")?)
        };

        instruments.push(Instrument {
            ticker,
            sector,
            listing_start,
            listing_end,
        });
    }
    Ok(instruments)
}

/// `ticker,date,close` — adjusted closes, one row per observation.
pub fn read_prices(path: &Path) -> Result<Vec<PriceObservation>, QuantfolioError> {
    let content = read_content(path)?;
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut observations = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| read_err(format!("CSV parse error: {e}")))?;

        let ticker = get_field(&record, 0, "ticker")?.trim().to_uppercase();
        let date = parse_field_date(get_field(&record, 1, "date")?, "date")?;
        let close: f64 = get_field(&record, 2, "close")?
            .trim()
            .parse()
            .map_err(|e| read_err(format!("invalid close value: {e}")))?;

        observations.push(PriceObservation {
            ticker,
            date,
            close,
        });
    }
    Ok(observations)
}

/// `ticker,date,pe_ratio,pb_ratio,roe,debt_equity` — metric columns may be
/// blank; a blank stays missing.
pub fn read_fundamentals(path: &Path) -> Result<Vec<FundamentalSnapshot>, QuantfolioError> {
    let content = read_content(path)?;
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut snapshots = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| read_err(format!("CSV parse error: {e}")))?;

        let ticker = get_field(&record, 0, "ticker")?.trim().to_uppercase();
        let date = parse_field_date(get_field(&record, 1, "date")?, "date")?;

        snapshots.push(FundamentalSnapshot {
            ticker,
            date,
            pe_ratio: parse_optional_f64(record.get(2).unwrap_or(""), "pe_ratio")?,
            pb_ratio: parse_optional_f64(record.get(3).unwrap_or(""), "pb_ratio")?,
            roe: parse_optional_f64(record.get(4).unwrap_or(""), "roe")?,
            debt_equity: parse_optional_f64(record.get(5).unwrap_or(""), "debt_equity")?,
        });
    }
    Ok(snapshots)
}
