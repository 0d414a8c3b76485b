//! Point-in-time fundamental snapshots.

use chrono::NaiveDate;

/// One fundamental snapshot for an instrument. Fields are optional because
/// providers genuinely omit metrics (loss-making names have no trailing P/E);
/// a missing field stays missing, it is never imputed.
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalSnapshot {
    pub ticker: String,
    pub date: NaiveDate,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub debt_equity: Option<f64>,
}

/// Latest snapshot at or before `date` from a per-instrument history.
/// Using a snapshot dated after `date` would be look-ahead.
pub fn latest_at_or_before(
    history: &[FundamentalSnapshot],
    date: NaiveDate,
) -> Option<&FundamentalSnapshot> {
    history
        .iter()
        .filter(|s| s.date <= date)
        .max_by_key(|s| s.date)
}
