//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::engine_config::{
    build_backtest_span, build_engine_config, build_profiles, find_profile,
};
use crate::domain::error::QuantfolioError;
use crate::domain::selection::Portfolio;

#[derive(Parser, Debug)]
#[command(name = "quantfolio", about = "Factor-ranked equity portfolio engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the current portfolio for a risk profile
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        profile: String,
        /// Evaluation date (defaults to the latest stored price date)
        #[arg(long)]
        date: Option<String>,
        /// Persist the factor scores and portfolio to the store
        #[arg(long)]
        save: bool,
        /// Directory for a CSV copy of the holding list
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay the factor chain across the configured date range and persist
    /// scores and portfolios per rebalance date
    Replay {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a historical backtest for a risk profile against the benchmark
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        profile: String,
        /// Directory for CSV copies of the NAV series and summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load the instrument universe from a CSV file
    ImportUniverse {
        #[arg(short, long)]
        config: PathBuf,
        file: PathBuf,
    },
    /// Load price observations from a CSV file
    ImportPrices {
        #[arg(short, long)]
        config: PathBuf,
        file: PathBuf,
    },
    /// Load fundamental snapshots from a CSV file
    ImportFundamentals {
        #[arg(short, long)]
        config: PathBuf,
        file: PathBuf,
    },
    /// List the stored instrument universe
    ListInstruments {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show stored data ranges for one or all tickers
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Portfolio {
            config,
            profile,
            date,
            save,
            output,
        } => run_portfolio(&config, &profile, date.as_deref(), save, output.as_ref()),
        Command::Replay { config } => run_replay(&config),
        Command::Backtest {
            config,
            profile,
            output,
        } => run_backtest(&config, &profile, output.as_ref()),
        Command::ImportUniverse { config, file } => run_import(&config, &file, ImportKind::Universe),
        Command::ImportPrices { config, file } => run_import(&config, &file, ImportKind::Prices),
        Command::ImportFundamentals { config, file } => {
            run_import(&config, &file, ImportKind::Fundamentals)
        }
        Command::ListInstruments { config } => run_list_instruments(&config),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = QuantfolioError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &QuantfolioError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate, QuantfolioError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| QuantfolioError::ConfigInvalid {
        section: "cli".into(),
        key: "date".into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

fn print_portfolio(portfolio: &Portfolio) {
    if portfolio.is_degraded() {
        eprintln!(
            "warning: only {} of {} requested names survived the momentum filter",
            portfolio.holdings.len(),
            portfolio.requested_size,
        );
    }
    println!("rank  ticker      weight   score");
    for (rank, holding) in portfolio.holdings.iter().enumerate() {
        println!(
            "{:>4}  {:<10}  {:.4}   {:.3}",
            rank + 1,
            holding.ticker,
            holding.weight,
            holding.score,
        );
    }
}

enum ImportKind {
    Universe,
    Prices,
    Fundamentals,
}

fn run_portfolio(
    config_path: &PathBuf,
    profile_name: &str,
    date_override: Option<&str>,
    save: bool,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let profiles = match build_profiles(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let profile = match find_profile(&profiles, profile_name) {
        Ok(p) => p.clone(),
        Err(e) => return fail(&e),
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        use crate::domain::replay::evaluate_date;
        use crate::ports::data_port::MarketDataPort;
        use crate::ports::store_port::ScoreStorePort;

        let store = match SqliteAdapter::from_config(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        if let Err(e) = store.initialize_schema() {
            return fail(&e);
        }

        let date = match date_override {
            Some(raw) => match parse_cli_date(raw) {
                Ok(d) => d,
                Err(e) => return fail(&e),
            },
            None => match store.latest_price_date() {
                Ok(Some(d)) => d,
                Ok(None) => {
                    return fail(&QuantfolioError::NoData {
                        ticker: "any".into(),
                    })
                }
                Err(e) => return fail(&e),
            },
        };

        let universe = match store.instruments() {
            Ok(u) => u,
            Err(e) => return fail(&e),
        };
        eprintln!(
            "Evaluating {} profile over {} instruments at {}",
            profile.name,
            universe.len(),
            date,
        );

        let snapshot = match evaluate_date(&store, &universe, date, &engine, &[profile]) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        let portfolio = &snapshot.portfolios[0];
        print_portfolio(portfolio);

        if save {
            if let Err(e) = store.save_factor_scores(&snapshot.frame) {
                return fail(&e);
            }
            if let Err(e) = store.save_portfolio(portfolio) {
                return fail(&e);
            }
            eprintln!("Saved factor scores and portfolio for {date}");
        }

        if let Some(dir) = output {
            use crate::adapters::csv_report_adapter::CsvReportAdapter;
            use crate::ports::report_port::ReportPort;
            let report = CsvReportAdapter::new(dir.clone());
            if let Err(e) = report.write_portfolio(portfolio) {
                return fail(&e);
            }
            eprintln!("Holding list written to {}", dir.display());
        }

        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (engine, profile, date_override, save, output);
        eprintln!("error: sqlite feature is required for portfolio");
        ExitCode::from(1)
    }
}

fn run_replay(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let profiles = match build_profiles(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let span = match build_backtest_span(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        use crate::domain::replay;
        use crate::ports::store_port::ScoreStorePort;
        use indicatif::ProgressBar;

        let store = match SqliteAdapter::from_config(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        if let Err(e) = store.initialize_schema() {
            return fail(&e);
        }

        let schedule =
            replay::rebalance_schedule(span.start_date, span.end_date, engine.rebalance);
        eprintln!(
            "Replaying {} rebalance dates, {} to {}",
            schedule.len(),
            span.start_date,
            span.end_date,
        );

        let bar = ProgressBar::new(schedule.len() as u64);
        let snapshots = match replay::run_replay(
            &store,
            &engine,
            &profiles,
            span.start_date,
            span.end_date,
            |progress| {
                bar.set_message(progress.date.to_string());
                bar.inc(1);
            },
        ) {
            Ok(s) => s,
            Err(e) => {
                bar.abandon();
                return fail(&e);
            }
        };
        bar.finish();

        for snapshot in &snapshots {
            if let Err(e) = store.save_factor_scores(&snapshot.frame) {
                return fail(&e);
            }
            for portfolio in &snapshot.portfolios {
                if let Err(e) = store.save_portfolio(portfolio) {
                    return fail(&e);
                }
            }
        }

        let degraded = snapshots
            .iter()
            .flat_map(|s| s.portfolios.iter())
            .filter(|p| p.is_degraded())
            .count();
        eprintln!(
            "Saved {} dates x {} profiles ({} degraded portfolios)",
            snapshots.len(),
            profiles.len(),
            degraded,
        );
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (engine, profiles, span);
        eprintln!("error: sqlite feature is required for replay");
        ExitCode::from(1)
    }
}

fn run_backtest(config_path: &PathBuf, profile_name: &str, output: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let profiles = match build_profiles(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let profile = match find_profile(&profiles, profile_name) {
        Ok(p) => p.clone(),
        Err(e) => return fail(&e),
    };
    let span = match build_backtest_span(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        use crate::domain::replay;
        use crate::domain::simulate::run_simulation;
        use crate::domain::stats::{benchmark_stats, strategy_stats};
        use crate::ports::store_port::ScoreStorePort;
        use indicatif::ProgressBar;

        let store = match SqliteAdapter::from_config(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        if let Err(e) = store.initialize_schema() {
            return fail(&e);
        }

        eprintln!(
            "Backtesting {} profile, {} to {}, benchmark {}",
            profile.name, span.start_date, span.end_date, span.benchmark,
        );

        let schedule =
            replay::rebalance_schedule(span.start_date, span.end_date, engine.rebalance);
        let bar = ProgressBar::new(schedule.len() as u64);
        let snapshots = match replay::run_replay(
            &store,
            &engine,
            std::slice::from_ref(&profile),
            span.start_date,
            span.end_date,
            |progress| {
                bar.set_message(progress.date.to_string());
                bar.inc(1);
            },
        ) {
            Ok(s) => s,
            Err(e) => {
                bar.abandon();
                return fail(&e);
            }
        };
        bar.finish();

        let portfolios: Vec<Portfolio> = snapshots
            .iter()
            .filter_map(|s| s.portfolio_for(&profile.name).cloned())
            .collect();

        let simulation = match run_simulation(&store, &portfolios, &span.benchmark) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };

        for warning in &simulation.warnings {
            eprintln!(
                "warning: {} at {}: {}",
                warning.ticker, warning.date, warning.reason,
            );
        }

        let periods_per_year = engine.rebalance.periods_per_year();
        let strategy = strategy_stats(&simulation.results, span.risk_free_rate, periods_per_year);
        let benchmark =
            benchmark_stats(&simulation.results, span.risk_free_rate, periods_per_year);

        eprintln!("\n=== Strategy ({}) ===", profile.name);
        eprintln!("Total Return:     {:.2}%", strategy.total_return * 100.0);
        eprintln!("CAGR:             {:.2}%", strategy.cagr * 100.0);
        eprintln!("Sharpe Ratio:     {:.2}", strategy.sharpe_ratio);
        eprintln!("Max Drawdown:     -{:.1}%", strategy.max_drawdown * 100.0);
        eprintln!("Periods:          {}", strategy.periods);

        eprintln!("\n=== Benchmark ({}) ===", span.benchmark);
        eprintln!("Total Return:     {:.2}%", benchmark.total_return * 100.0);
        eprintln!("CAGR:             {:.2}%", benchmark.cagr * 100.0);
        eprintln!("Sharpe Ratio:     {:.2}", benchmark.sharpe_ratio);
        eprintln!("Max Drawdown:     -{:.1}%", benchmark.max_drawdown * 100.0);

        if let Err(e) = store.save_backtest_results(&profile.name, &simulation.results) {
            return fail(&e);
        }

        if let Some(dir) = output {
            use crate::adapters::csv_report_adapter::CsvReportAdapter;
            use crate::ports::report_port::ReportPort;
            let report = CsvReportAdapter::new(dir.clone());
            if let Err(e) =
                report.write_backtest(&profile.name, &simulation.results, &strategy, &benchmark)
            {
                return fail(&e);
            }
            eprintln!("\nReport written to {}", dir.display());
        }

        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (engine, profile, span, output);
        eprintln!("error: sqlite feature is required for backtest");
        ExitCode::from(1)
    }
}

fn run_import(config_path: &PathBuf, file: &PathBuf, kind: ImportKind) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::csv_import_adapter;
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = match SqliteAdapter::from_config(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        if let Err(e) = store.initialize_schema() {
            return fail(&e);
        }

        let result = match kind {
            ImportKind::Universe => csv_import_adapter::read_universe(file)
                .and_then(|rows| store.insert_instruments(&rows).map(|()| rows.len())),
            ImportKind::Prices => csv_import_adapter::read_prices(file)
                .and_then(|rows| store.insert_prices(&rows).map(|()| rows.len())),
            ImportKind::Fundamentals => csv_import_adapter::read_fundamentals(file)
                .and_then(|rows| store.insert_fundamentals(&rows).map(|()| rows.len())),
        };

        match result {
            Ok(count) => {
                eprintln!("Imported {} rows from {}", count, file.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (adapter, file, kind);
        eprintln!("error: sqlite feature is required for import");
        ExitCode::from(1)
    }
}

fn run_list_instruments(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        use crate::ports::data_port::MarketDataPort;

        let store = match SqliteAdapter::from_config(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        if let Err(e) = store.initialize_schema() {
            return fail(&e);
        }

        let instruments = match store.instruments() {
            Ok(i) => i,
            Err(e) => return fail(&e),
        };

        if instruments.is_empty() {
            eprintln!("No instruments in store");
        } else {
            for i in &instruments {
                let end = i
                    .listing_end
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}  {}  listed {} to {}", i.ticker, i.sector, i.listing_start, end);
            }
            eprintln!("{} instruments", instruments.len());
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = adapter;
        eprintln!("error: sqlite feature is required for list-instruments");
        ExitCode::from(1)
    }
}

fn run_info(config_path: &PathBuf, ticker: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        use crate::ports::data_port::MarketDataPort;

        let store = match SqliteAdapter::from_config(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        if let Err(e) = store.initialize_schema() {
            return fail(&e);
        }

        let tickers: Vec<String> = match ticker {
            Some(t) => vec![t.to_uppercase()],
            None => match store.instruments() {
                Ok(instruments) => instruments.into_iter().map(|i| i.ticker).collect(),
                Err(e) => return fail(&e),
            },
        };

        for t in &tickers {
            match store.data_range(t) {
                Ok(Some((min_date, max_date, count))) => {
                    println!("{}: {} observations, {} to {}", t, count, min_date, max_date);
                }
                Ok(None) => eprintln!("{}: no data found", t),
                Err(e) => eprintln!("error querying {}: {}", t, e),
            }
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (adapter, ticker);
        eprintln!("error: sqlite feature is required for info");
        ExitCode::from(1)
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let profiles = match build_profiles(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let span = match build_backtest_span(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "  engine: K={}, momentum filter {:.2}, {} rebalance, {} weighting",
        engine.portfolio_size,
        engine.momentum_filter,
        engine.rebalance.name(),
        engine.weighting.name(),
    );
    let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    eprintln!("  profiles: {}", names.join(", "));
    eprintln!(
        "  backtest: {} to {}, benchmark {}",
        span.start_date, span.end_date, span.benchmark,
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
