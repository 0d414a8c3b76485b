//! SQLite store adapter: instrument/price/fundamental reads and persistence
//! of derived factor scores, portfolios, and backtest results.

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::domain::engine::FactorFrame;
use crate::domain::error::QuantfolioError;
use crate::domain::factor::Factor;
use crate::domain::fundamentals::FundamentalSnapshot;
use crate::domain::instrument::Instrument;
use crate::domain::price::{PriceObservation, PriceSeries};
use crate::domain::selection::Portfolio;
use crate::domain::simulate::BacktestResult;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::store_port::ScoreStorePort;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

fn db_err(e: r2d2::Error) -> QuantfolioError {
    QuantfolioError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> QuantfolioError {
    QuantfolioError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate, QuantfolioError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| QuantfolioError::DatabaseQuery {
        reason: format!("invalid stored date {raw}: {e}"),
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantfolioError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| QuantfolioError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory store for tests. One connection only:
    /// each new `:memory:` connection would otherwise be a fresh database.
    pub fn in_memory() -> Result<Self, QuantfolioError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConn, QuantfolioError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), QuantfolioError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS instruments (
                    ticker TEXT PRIMARY KEY,
                    sector TEXT NOT NULL,
                    listing_start TEXT NOT NULL,
                    listing_end TEXT
                );
                CREATE TABLE IF NOT EXISTS daily_prices (
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    close REAL NOT NULL,
                    PRIMARY KEY (ticker, date)
                );
                CREATE INDEX IF NOT EXISTS idx_prices_ticker_date
                    ON daily_prices(ticker, date);
                CREATE TABLE IF NOT EXISTS fundamentals (
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    pe_ratio REAL,
                    pb_ratio REAL,
                    roe REAL,
                    debt_equity REAL,
                    PRIMARY KEY (ticker, date)
                );
                CREATE TABLE IF NOT EXISTS factor_scores (
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    factor TEXT NOT NULL,
                    raw_value REAL,
                    bucket INTEGER NOT NULL,
                    PRIMARY KEY (ticker, date, factor)
                );
                CREATE TABLE IF NOT EXISTS portfolios (
                    date TEXT NOT NULL,
                    profile TEXT NOT NULL,
                    rank INTEGER NOT NULL,
                    ticker TEXT NOT NULL,
                    weight REAL NOT NULL,
                    score REAL NOT NULL,
                    requested_size INTEGER NOT NULL,
                    PRIMARY KEY (date, profile, ticker)
                );
                CREATE TABLE IF NOT EXISTS backtest_results (
                    profile TEXT NOT NULL,
                    date TEXT NOT NULL,
                    nav REAL NOT NULL,
                    benchmark_nav REAL NOT NULL,
                    period_return REAL NOT NULL,
                    PRIMARY KEY (profile, date)
                );",
            )
            .map_err(query_err)
    }

    pub fn insert_instruments(&self, instruments: &[Instrument]) -> Result<(), QuantfolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for i in instruments {
            tx.execute(
                "INSERT OR REPLACE INTO instruments (ticker, sector, listing_start, listing_end)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    i.ticker,
                    i.sector,
                    format_date(i.listing_start),
                    i.listing_end.map(format_date)
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    pub fn insert_prices(&self, observations: &[PriceObservation]) -> Result<(), QuantfolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for o in observations {
            tx.execute(
                "INSERT OR REPLACE INTO daily_prices (ticker, date, close)
                 VALUES (?1, ?2, ?3)",
                params![o.ticker, format_date(o.date), o.close],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    pub fn insert_fundamentals(
        &self,
        snapshots: &[FundamentalSnapshot],
    ) -> Result<(), QuantfolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for s in snapshots {
            tx.execute(
                "INSERT OR REPLACE INTO fundamentals
                 (ticker, date, pe_ratio, pb_ratio, roe, debt_equity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    s.ticker,
                    format_date(s.date),
                    s.pe_ratio,
                    s.pb_ratio,
                    s.roe,
                    s.debt_equity
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }
}

impl MarketDataPort for SqliteAdapter {
    fn instruments(&self) -> Result<Vec<Instrument>, QuantfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT ticker, sector, listing_start, listing_end
                 FROM instruments ORDER BY ticker",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(query_err)?;

        let mut instruments = Vec::new();
        for row in rows {
            let (ticker, sector, start, end) = row.map_err(query_err)?;
            instruments.push(Instrument {
                ticker,
                sector,
                listing_start: parse_date(&start)?,
                listing_end: end.as_deref().map(parse_date).transpose()?,
            });
        }
        Ok(instruments)
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, QuantfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, close FROM daily_prices
                 WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![ticker, format_date(start), format_date(end)],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .map_err(query_err)?;

        let mut observations = Vec::new();
        for row in rows {
            let (date, close) = row.map_err(query_err)?;
            observations.push(PriceObservation {
                ticker: ticker.to_string(),
                date: parse_date(&date)?,
                close,
            });
        }
        Ok(PriceSeries::new(observations))
    }

    fn fundamentals_at_or_before(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<Option<FundamentalSnapshot>, QuantfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, pe_ratio, pb_ratio, roe, debt_equity
                 FROM fundamentals
                 WHERE ticker = ?1 AND date <= ?2
                 ORDER BY date DESC LIMIT 1",
            )
            .map_err(query_err)?;

        let mut rows = stmt
            .query_map(params![ticker, format_date(date)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                ))
            })
            .map_err(query_err)?;

        match rows.next() {
            Some(row) => {
                let (snap_date, pe_ratio, pb_ratio, roe, debt_equity) = row.map_err(query_err)?;
                Ok(Some(FundamentalSnapshot {
                    ticker: ticker.to_string(),
                    date: parse_date(&snap_date)?,
                    pe_ratio,
                    pb_ratio,
                    roe,
                    debt_equity,
                }))
            }
            None => Ok(None),
        }
    }

    fn latest_price_date(&self) -> Result<Option<NaiveDate>, QuantfolioError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row("SELECT MAX(date) FROM daily_prices", [], |row| row.get(0))
            .map_err(query_err)?;
        raw.as_deref().map(parse_date).transpose()
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuantfolioError> {
        let conn = self.conn()?;
        let row: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM daily_prices WHERE ticker = ?1",
                params![ticker],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match row {
            (Some(min), Some(max), count) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl ScoreStorePort for SqliteAdapter {
    fn save_factor_scores(&self, frame: &FactorFrame) -> Result<(), QuantfolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let date = format_date(frame.date);

        // Re-running a date replaces that date's rows and nothing else.
        tx.execute("DELETE FROM factor_scores WHERE date = ?1", params![date])
            .map_err(query_err)?;

        for row in &frame.rows {
            for factor in Factor::ALL {
                tx.execute(
                    "INSERT INTO factor_scores (ticker, date, factor, raw_value, bucket)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        row.ticker,
                        date,
                        factor.name(),
                        row.raw_value(factor).present(),
                        i64::from(row.bucket(factor))
                    ],
                )
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)
    }

    fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), QuantfolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let date = format_date(portfolio.date);

        tx.execute(
            "DELETE FROM portfolios WHERE date = ?1 AND profile = ?2",
            params![date, portfolio.profile],
        )
        .map_err(query_err)?;

        for (rank, holding) in portfolio.holdings.iter().enumerate() {
            tx.execute(
                "INSERT INTO portfolios
                 (date, profile, rank, ticker, weight, score, requested_size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    date,
                    portfolio.profile,
                    rank as i64 + 1,
                    holding.ticker,
                    holding.weight,
                    holding.score,
                    portfolio.requested_size as i64
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    fn save_backtest_results(
        &self,
        profile: &str,
        results: &[BacktestResult],
    ) -> Result<(), QuantfolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "DELETE FROM backtest_results WHERE profile = ?1",
            params![profile],
        )
        .map_err(query_err)?;

        for r in results {
            tx.execute(
                "INSERT INTO backtest_results
                 (profile, date, nav, benchmark_nav, period_return)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    profile,
                    format_date(r.date),
                    r.nav,
                    r.benchmark_nav,
                    r.period_return
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }
}
