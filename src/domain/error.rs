//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for quantfolio.
#[derive(Debug, thiserror::Error)]
pub enum QuantfolioError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown risk profile: {name}")]
    UnknownProfile { name: String },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("missing benchmark observation for {ticker} at {date}")]
    BenchmarkGap { ticker: String, date: NaiveDate },

    #[error("backtest range {start} to {end} produced fewer than two rebalance dates")]
    EmptySchedule { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&QuantfolioError> for std::process::ExitCode {
    fn from(err: &QuantfolioError) -> Self {
        let code: u8 = match err {
            QuantfolioError::Io(_) => 1,
            QuantfolioError::ConfigParse { .. }
            | QuantfolioError::ConfigMissing { .. }
            | QuantfolioError::ConfigInvalid { .. }
            | QuantfolioError::UnknownProfile { .. } => 2,
            QuantfolioError::Database { .. } | QuantfolioError::DatabaseQuery { .. } => 3,
            QuantfolioError::BenchmarkGap { .. } | QuantfolioError::EmptySchedule { .. } => 4,
            QuantfolioError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
