//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::diagnostics_adapter::TracingSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_adapter::MemoryProvider;
use crate::domain::config::{EngineConfig, build_engine_config};
use crate::domain::config_validation::validate_engine_config;
use crate::domain::error::EquisimError;
use crate::domain::result::SimulationResult;
use crate::domain::simulator::{MarketData, run_simulation, score_instrument};

#[derive(Parser, Debug)]
#[command(name = "equisim", about = "Trading signal and portfolio simulation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a portfolio simulation
    Simulate {
        /// Directory with {INSTRUMENT}.csv, fundamentals.csv and sentiment.csv
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Comma-separated instruments; defaults to the config, then to every
        /// price file in the data directory
        #[arg(short, long)]
        instruments: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        capital: Option<f64>,
        /// Write the result as JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Score one instrument as of a date
    Score {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        instrument: String,
        /// Defaults to the last date in the data
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Simulate {
            data,
            config,
            instruments,
            start,
            end,
            capital,
            output,
        } => run_simulate(SimulateArgs {
            data,
            config,
            instruments,
            start,
            end,
            capital,
            output,
        }),
        Command::Score {
            data,
            config,
            instrument,
            date,
        } => run_score(&data, config.as_deref(), &instrument, date),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Reads and validates an engine config; defaults when no file is given.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, EquisimError> {
    let config = match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            build_engine_config(&FileConfigAdapter::from_file(path)?)?
        }
        None => EngineConfig::default(),
    };
    validate_engine_config(&config)?;
    Ok(config)
}

struct SimulateArgs {
    data: PathBuf,
    config: Option<PathBuf>,
    instruments: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    capital: Option<f64>,
    output: Option<PathBuf>,
}

fn run_simulate(args: SimulateArgs) -> Result<(), EquisimError> {
    let config = load_engine_config(args.config.as_deref())?;

    let mut instruments: Vec<String> = match &args.instruments {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => config.simulation.instruments.clone(),
    };

    let provider = CsvAdapter::new(args.data.clone()).load(&instruments)?;
    if instruments.is_empty() {
        instruments = provider.instruments();
    }

    let (start, end) = resolve_dates(&provider, args.start, args.end, &config)?;
    let capital = args.capital.unwrap_or(config.simulation.initial_capital);

    eprintln!(
        "Running simulation: {} instruments, {} to {} ({} strategy)",
        instruments.len(),
        start,
        end,
        config.simulation.strategy.name()
    );

    let result = run_simulation(
        &instruments,
        start,
        end,
        capital,
        &config,
        MarketData::from_provider(&provider),
        &TracingSink,
    )?;

    print_summary(&result);

    let json = result.to_json()?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            eprintln!("\nResult written to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn resolve_dates(
    provider: &MemoryProvider,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    config: &EngineConfig,
) -> Result<(NaiveDate, NaiveDate), EquisimError> {
    let range = provider.date_range();
    let start = start
        .or(config.simulation.start_date)
        .or(range.map(|(first, _)| first));
    let end = end
        .or(config.simulation.end_date)
        .or(range.map(|(_, last)| last));
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(EquisimError::invalid_config(
            "simulation.start_date",
            "no dates given and no price data to infer them from",
        )),
    }
}

fn print_summary(result: &SimulationResult) {
    let m = &result.metrics;
    eprintln!("\n=== Simulation Results ===");
    eprintln!("Periods:          {}", result.periods.len());
    eprintln!("Final Equity:     {:.2}", result.final_equity);
    eprintln!(
        "Total P&L:        {:.2} ({:.2}%)",
        m.total_pnl,
        m.total_return * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.3}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Period Win Rate:  {:.1}%", m.period_win_rate * 100.0);
    eprintln!("Total Trades:     {}", result.trades.len());
    eprintln!("Trade Win Rate:   {:.1}%", m.trade_win_rate * 100.0);
    match m.profit_factor {
        Some(pf) => eprintln!("Profit Factor:    {:.2}", pf),
        None => eprintln!("Profit Factor:    n/a (no losing trades)"),
    }
    if !result.diagnostics.is_empty() {
        eprintln!("Diagnostics:      {}", result.diagnostics.len());
    }
}

fn run_score(
    data: &Path,
    config_path: Option<&Path>,
    instrument: &str,
    date: Option<NaiveDate>,
) -> Result<(), EquisimError> {
    let config = load_engine_config(config_path)?;
    let provider = CsvAdapter::new(data.to_path_buf()).load(&[instrument.to_string()])?;

    let Some(as_of) = date.or(provider.date_range().map(|(_, last)| last)) else {
        return Err(EquisimError::DataUnavailable {
            instrument: instrument.to_string(),
            reason: "no price data".to_string(),
        });
    };

    match score_instrument(MarketData::from_provider(&provider), instrument, as_of, &config)? {
        Some(signal) => {
            eprintln!(
                "{} {}: {} (score {:.3})",
                instrument, as_of, signal.action, signal.score
            );
            for ev in &signal.evidence {
                eprintln!("  {:<28} {:+.3}", ev.tag, ev.contribution);
            }
            println!("{}", serde_json::to_string_pretty(&signal)?);
            Ok(())
        }
        None => Err(EquisimError::DataUnavailable {
            instrument: instrument.to_string(),
            reason: format!("no bar on or before {}", as_of),
        }),
    }
}

fn run_validate(config_path: &Path) -> Result<(), EquisimError> {
    let config = load_engine_config(Some(config_path))?;
    eprintln!("Config validated successfully");
    eprintln!("  strategy:   {}", config.simulation.strategy.name());
    eprintln!(
        "  thresholds: {} / {} / {} | {} / {} / {}",
        config.thresholds.very_strong_sell,
        config.thresholds.strong_sell,
        config.thresholds.sell,
        config.thresholds.buy,
        config.thresholds.strong_buy,
        config.thresholds.very_strong_buy
    );
    eprintln!(
        "  weights:    technical {} fundamental {} sentiment {}",
        config.weights.technical, config.weights.fundamental, config.weights.sentiment
    );
    if !config.simulation.instruments.is_empty() {
        eprintln!("  instruments: {}", config.simulation.instruments.join(", "));
    }
    Ok(())
}
