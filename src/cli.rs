//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::{JsonReportAdapter, STDOUT_PATH};
use crate::adapters::synthetic_adapter::{
    DEFAULT_SYNTHETIC_SEED, SYNTHETIC_MARKET, SyntheticAdapter,
};
use crate::domain::backtest::{
    BacktestConfig, DEFAULT_INITIAL_CASH, DEFAULT_PERIODS_PER_YEAR, RunParameters, run_backtest,
};
use crate::domain::config_validation::{
    validate_backtest_config, validate_optimizer_config, validate_run_config,
};
use crate::domain::error::AlgoedgeError;
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::ohlcv::PriceBar;
use crate::domain::optimizer::{
    DEFAULT_OBJECTIVE, DEFAULT_SAMPLES, DEFAULT_SEED, Optimizer, ParamSpace,
};
use crate::domain::strategy::{StrategyDocument, normalize};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Parser, Debug)]
#[command(name = "algoedge", about = "Strategy backtester and parameter optimizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Data selection flags shared by `backtest` and `optimize`; each overrides `[run]`.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    #[arg(long)]
    pub symbol: Option<String>,
    /// `synthetic` generates seeded bars instead of reading CSV
    #[arg(long)]
    pub market: Option<String>,
    #[arg(long)]
    pub timeframe: Option<String>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: PathBuf,
        #[command(flatten)]
        data: DataArgs,
        /// Report path; standard output when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Random-search indicator parameters
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: PathBuf,
        /// Parameter space JSON
        #[arg(short = 'p', long)]
        space: PathBuf,
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        objective: Option<String>,
        #[arg(long)]
        workers: Option<usize>,
        /// Stop starting new candidates after this many seconds
        #[arg(long)]
        time_limit: Option<u64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a strategy document and print its normalized form
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
}

/// Resolved `[optimizer]` settings after CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    pub samples: usize,
    pub seed: u64,
    pub objective: String,
    pub workers: usize,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            strategy,
            data,
            output,
        } => run_backtest_command(&config, &strategy, &data, output.as_deref()),
        Command::Optimize {
            config,
            strategy,
            space,
            data,
            samples,
            seed,
            objective,
            workers,
            time_limit,
            output,
        } => {
            let overrides = OptimizerOverrides {
                samples,
                seed,
                objective,
                workers,
            };
            run_optimize_command(
                &config,
                &strategy,
                &space,
                &data,
                &overrides,
                time_limit,
                output.as_deref(),
            )
        }
        Command::Validate { strategy } => run_validate(&strategy),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AlgoedgeError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn load_strategy(path: &Path) -> Result<StrategyDocument, AlgoedgeError> {
    let content = fs::read_to_string(path)?;
    StrategyDocument::from_json(&content)
}

fn output_target(output: Option<&Path>) -> String {
    output
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| STDOUT_PATH.to_string())
}

pub fn build_run_parameters(adapter: &dyn ConfigPort, data: &DataArgs) -> RunParameters {
    let defaults = RunParameters::default();
    let years = adapter.get_int("run", "years", defaults.years as i64);
    RunParameters {
        symbol: data
            .symbol
            .clone()
            .or_else(|| adapter.get_string("run", "symbol"))
            .unwrap_or(defaults.symbol),
        market: data
            .market
            .clone()
            .unwrap_or_else(|| adapter.get_string_or("run", "market", &defaults.market)),
        timeframe: data
            .timeframe
            .clone()
            .or_else(|| adapter.get_string("run", "timeframe"))
            .unwrap_or(defaults.timeframe),
        years: u32::try_from(years).unwrap_or(0),
        initial_cash: adapter.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH),
    }
}

pub fn resolve_data_dir(adapter: &dyn ConfigPort, data: &DataArgs) -> PathBuf {
    data.data_dir
        .clone()
        .or_else(|| adapter.get_string("run", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let periods = adapter.get_int(
        "backtest",
        "periods_per_year",
        DEFAULT_PERIODS_PER_YEAR as i64,
    );
    BacktestConfig {
        initial_cash: adapter.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
        periods_per_year: u32::try_from(periods).unwrap_or(DEFAULT_PERIODS_PER_YEAR),
    }
}

/// `optimize` flags that take precedence over `[optimizer]`.
#[derive(Debug, Clone, Default)]
pub struct OptimizerOverrides {
    pub samples: Option<usize>,
    pub seed: Option<u64>,
    pub objective: Option<String>,
    pub workers: Option<usize>,
}

pub fn build_optimizer_settings(
    adapter: &dyn ConfigPort,
    overrides: &OptimizerOverrides,
) -> Result<OptimizerSettings, AlgoedgeError> {
    let samples = overrides.samples.unwrap_or_else(|| {
        usize::try_from(adapter.get_int("optimizer", "samples", DEFAULT_SAMPLES as i64))
            .unwrap_or(DEFAULT_SAMPLES)
    });
    if samples == 0 {
        return Err(AlgoedgeError::ConfigInvalid {
            section: "optimizer".into(),
            key: "samples".into(),
            reason: "samples must be positive".into(),
        });
    }

    let seed = overrides.seed.unwrap_or_else(|| {
        u64::try_from(adapter.get_int("optimizer", "seed", DEFAULT_SEED as i64))
            .unwrap_or(DEFAULT_SEED)
    });
    let workers = overrides.workers.unwrap_or_else(|| {
        usize::try_from(adapter.get_int("optimizer", "workers", 0)).unwrap_or(0)
    });
    let objective = overrides
        .objective
        .clone()
        .or_else(|| adapter.get_string("optimizer", "objective"))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_OBJECTIVE.to_string());

    if !MetricsSnapshot::is_known(&objective) {
        return Err(AlgoedgeError::UnknownObjective { name: objective });
    }

    Ok(OptimizerSettings {
        samples,
        seed,
        objective,
        workers,
    })
}

/// Pick the data source for `params`.
///
/// `market = synthetic` always generates bars. Otherwise bars come from CSV,
/// falling back to generated bars when `[run] synthetic_fallback` is set and
/// no file exists.
pub fn select_data_port(
    adapter: &dyn ConfigPort,
    data: &DataArgs,
    params: &RunParameters,
) -> Box<dyn DataPort> {
    let seed = adapter.get_int("run", "synthetic_seed", DEFAULT_SYNTHETIC_SEED as i64);
    let seed = u64::try_from(seed).unwrap_or(DEFAULT_SYNTHETIC_SEED);
    if params.market.eq_ignore_ascii_case(SYNTHETIC_MARKET) {
        return Box::new(SyntheticAdapter::new(seed));
    }
    let csv = CsvAdapter::new(resolve_data_dir(adapter, data));
    if !csv.has_file(params) && adapter.get_bool("run", "synthetic_fallback", false) {
        warn!(
            "no CSV data for {} {}, using synthetic bars (seed {seed})",
            params.symbol, params.timeframe
        );
        return Box::new(SyntheticAdapter::new(seed));
    }
    Box::new(csv)
}

fn fetch_bars(
    adapter: &dyn ConfigPort,
    data: &DataArgs,
    params: &RunParameters,
) -> Result<Vec<PriceBar>, AlgoedgeError> {
    let bars = select_data_port(adapter, data, params).fetch_bars(params)?;
    info!(
        "loaded {} bars for {} ({}, {})",
        bars.len(),
        params.symbol,
        params.market,
        params.timeframe
    );
    Ok(bars)
}

fn print_metrics(metrics: &MetricsSnapshot) {
    eprintln!("ROI:              {:.2}%", metrics.roi_pct);
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.num_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
}

fn run_backtest_command(
    config_path: &Path,
    strategy_path: &Path,
    data: &DataArgs,
    output: Option<&Path>,
) -> Result<(), AlgoedgeError> {
    let adapter = load_config(config_path)?;
    validate_run_config(&adapter)?;
    validate_backtest_config(&adapter)?;

    eprintln!("Loading strategy from {}", strategy_path.display());
    let strategy = load_strategy(strategy_path)?;

    let params = build_run_parameters(&adapter, data);
    let bt_config = build_backtest_config(&adapter);
    let bars = fetch_bars(&adapter, data, &params)?;

    eprintln!(
        "Running backtest '{}': {} {} bars",
        strategy.name,
        bars.len(),
        params.timeframe
    );
    let result = run_backtest(&strategy, &bars, &bt_config)?;

    eprintln!("\n=== Results ===");
    print_metrics(&result.metrics);

    let target = output_target(output);
    JsonReportAdapter::new().write_backtest(&result, &strategy, &target)?;
    if target != STDOUT_PATH {
        eprintln!("\nReport written to: {target}");
    }
    Ok(())
}

fn run_optimize_command(
    config_path: &Path,
    strategy_path: &Path,
    space_path: &Path,
    data: &DataArgs,
    overrides: &OptimizerOverrides,
    time_limit: Option<u64>,
    output: Option<&Path>,
) -> Result<(), AlgoedgeError> {
    let adapter = load_config(config_path)?;
    validate_run_config(&adapter)?;
    validate_backtest_config(&adapter)?;
    validate_optimizer_config(&adapter)?;
    let settings = build_optimizer_settings(&adapter, overrides)?;

    eprintln!("Loading strategy from {}", strategy_path.display());
    let strategy = load_strategy(strategy_path)?;
    normalize(strategy.clone()).validate()?;

    let space = ParamSpace::from_json(&fs::read_to_string(space_path)?)?;

    let params = build_run_parameters(&adapter, data);
    let bt_config = build_backtest_config(&adapter);
    let bars = fetch_bars(&adapter, data, &params)?;

    eprintln!(
        "Optimizing '{}' for {}: {} samples, seed {}",
        strategy.name, settings.objective, settings.samples, settings.seed
    );

    let mut optimizer = Optimizer::new(&bars, bt_config).with_workers(settings.workers);
    if let Some(secs) = time_limit {
        optimizer = optimizer.with_deadline(Instant::now() + Duration::from_secs(secs));
    }
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let outcome = optimizer.search(
        &strategy,
        &space,
        &settings.objective,
        settings.samples,
        &mut rng,
    )?;

    eprintln!("\n=== Optimization ===");
    eprintln!(
        "Evaluated:        {} ({} failed, {} skipped)",
        outcome.evaluated, outcome.failed, outcome.skipped
    );
    match &outcome.best_metrics {
        Some(metrics) => {
            if let Some(candidate) = &outcome.best_candidate {
                eprintln!("Best parameters:  {}", serde_json::to_string(candidate)?);
            }
            print_metrics(metrics);
        }
        None => eprintln!("No candidate produced a score"),
    }

    let target = output_target(output);
    JsonReportAdapter::new().write_optimization(&outcome, &target)?;
    if target != STDOUT_PATH {
        eprintln!("\nReport written to: {target}");
    }
    Ok(())
}

pub fn run_validate(strategy_path: &Path) -> Result<(), AlgoedgeError> {
    let strategy = load_strategy(strategy_path)?;
    let normalized = normalize(strategy);
    normalized.validate()?;

    eprintln!("Strategy '{}' is valid", normalized.name);
    eprintln!("  indicators: {}", normalized.indicators().count());
    eprintln!(
        "  entry:      {} conditions",
        normalized.entry().map_or(0, |logic| logic.len())
    );
    eprintln!(
        "  exit:       {} conditions",
        normalized.exit().map_or(0, |logic| logic.len())
    );

    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}
