//! CSV report adapter: NAV series and portfolio holdings as flat files.

use std::path::PathBuf;

use crate::domain::error::QuantfolioError;
use crate::domain::selection::Portfolio;
use crate::domain::simulate::BacktestResult;
use crate::domain::stats::SummaryStats;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn write_err(e: csv::Error) -> QuantfolioError {
        QuantfolioError::Database {
            reason: format!("CSV write error: {e}"),
        }
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_backtest(
        &self,
        profile: &str,
        results: &[BacktestResult],
        strategy: &SummaryStats,
        benchmark: &SummaryStats,
    ) -> Result<(), QuantfolioError> {
        let nav_path = self.output_dir.join(format!("backtest_{profile}.csv"));
        let mut wtr = csv::Writer::from_path(&nav_path).map_err(Self::write_err)?;
        wtr.write_record(["date", "nav", "benchmark_nav", "period_return"])
            .map_err(Self::write_err)?;
        for r in results {
            wtr.write_record([
                r.date.format("%Y-%m-%d").to_string(),
                format!("{:.6}", r.nav),
                format!("{:.6}", r.benchmark_nav),
                format!("{:.6}", r.period_return),
            ])
            .map_err(Self::write_err)?;
        }
        wtr.flush().map_err(QuantfolioError::Io)?;

        let stats_path = self.output_dir.join(format!("summary_{profile}.csv"));
        let mut wtr = csv::Writer::from_path(&stats_path).map_err(Self::write_err)?;
        wtr.write_record([
            "series",
            "total_return",
            "cagr",
            "sharpe_ratio",
            "max_drawdown",
            "periods",
        ])
        .map_err(Self::write_err)?;
        for (name, stats) in [("strategy", strategy), ("benchmark", benchmark)] {
            wtr.write_record([
                name.to_string(),
                format!("{:.6}", stats.total_return),
                format!("{:.6}", stats.cagr),
                format!("{:.4}", stats.sharpe_ratio),
                format!("{:.6}", stats.max_drawdown),
                stats.periods.to_string(),
            ])
            .map_err(Self::write_err)?;
        }
        wtr.flush().map_err(QuantfolioError::Io)?;
        Ok(())
    }

    fn write_portfolio(&self, portfolio: &Portfolio) -> Result<(), QuantfolioError> {
        let path = self.output_dir.join(format!(
            "portfolio_{}_{}.csv",
            portfolio.profile,
            portfolio.date.format("%Y-%m-%d")
        ));
        let mut wtr = csv::Writer::from_path(&path).map_err(Self::write_err)?;
        wtr.write_record(["rank", "ticker", "weight", "score"])
            .map_err(Self::write_err)?;
        for (rank, holding) in portfolio.holdings.iter().enumerate() {
            wtr.write_record([
                (rank + 1).to_string(),
                holding.ticker.clone(),
                format!("{:.6}", holding.weight),
                format!("{:.4}", holding.score),
            ])
            .map_err(Self::write_err)?;
        }
        wtr.flush().map_err(QuantfolioError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::Holding;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn backtest_report_written() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());

        let results = vec![
            BacktestResult {
                date: date(2024, 1, 1),
                nav: 1.0,
                benchmark_nav: 1.0,
                period_return: 0.0,
            },
            BacktestResult {
                date: date(2024, 4, 1),
                nav: 1.05,
                benchmark_nav: 1.02,
                period_return: 0.05,
            },
        ];
        let stats = SummaryStats {
            total_return: 0.05,
            cagr: 0.21,
            sharpe_ratio: 1.5,
            max_drawdown: 0.0,
            periods: 1,
        };
        adapter
            .write_backtest("balanced", &results, &stats, &stats)
            .unwrap();

        let nav = fs::read_to_string(dir.path().join("backtest_balanced.csv")).unwrap();
        assert!(nav.starts_with("date,nav,benchmark_nav,period_return"));
        assert!(nav.contains("2024-04-01,1.050000"));

        let summary = fs::read_to_string(dir.path().join("summary_balanced.csv")).unwrap();
        assert!(summary.contains("strategy"));
        assert!(summary.contains("benchmark"));
    }

    #[test]
    fn portfolio_report_written_in_rank_order() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());

        let portfolio = Portfolio {
            date: date(2024, 1, 1),
            profile: "aggressive".into(),
            holdings: vec![
                Holding {
                    ticker: "AAA".into(),
                    weight: 0.5,
                    score: 5.5,
                },
                Holding {
                    ticker: "BBB".into(),
                    weight: 0.5,
                    score: 4.5,
                },
            ],
            requested_size: 2,
        };
        adapter.write_portfolio(&portfolio).unwrap();

        let content =
            fs::read_to_string(dir.path().join("portfolio_aggressive_2024-01-01.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "rank,ticker,weight,score");
        assert!(lines[1].starts_with("1,AAA"));
        assert!(lines[2].starts_with("2,BBB"));
    }
}
