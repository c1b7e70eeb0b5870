//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::csv_adapter::CsvHistory;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::adapters::replay::{run_replay, ReplaySummary};
use crate::adapters::telemetry::{CsvTelemetry, TracingTelemetry};
use crate::domain::backtest::{BacktestConfig, BreakoutAlgorithm};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_strategy_config, DEFAULT_INITIAL_CAPITAL,
    DEFAULT_MINUTES_AFTER_OPEN,
};
use crate::domain::error::BreakoutError;
use crate::domain::lookback::{
    LookbackBounds, DEFAULT_CEILING, DEFAULT_FLOOR, DEFAULT_HISTORY_BARS, DEFAULT_LOOKBACK,
};
use crate::domain::strategy::StrategyParams;
use crate::domain::trailing_stop::{
    StopRisk, DEFAULT_INITIAL_STOP_RISK, DEFAULT_TRAILING_STOP_RISK,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::history_port::HistoryPort;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "breakout", about = "Adaptive-lookback breakout backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the strategy over CSV history
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Write chart points to this CSV file
        #[arg(long)]
        telemetry: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range for a symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `verbose`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            data_dir,
            telemetry,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref(), data_dir.as_deref())
            } else {
                run_backtest(
                    &config,
                    symbol.as_deref(),
                    data_dir.as_deref(),
                    telemetry.as_deref(),
                )
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| report(&e))
}

fn report(err: &BreakoutError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    data_dir_override: Option<&Path>,
    telemetry_override: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load and validate config
    info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter).and_then(|_| validate_strategy_config(&adapter)) {
        return report(&e);
    }

    // Stage 2: Build the run parameters
    let bt_config = match resolve_backtest_config(&adapter, symbol_override) {
        Ok(c) => c,
        Err(e) => return report(&e),
    };
    let params = build_strategy_params(&adapter);
    let state = match params.initial_state() {
        Ok(s) => s,
        Err(e) => return report(&e),
    };
    info!(strategy = %params.name, symbol = %bt_config.symbol, "strategy loaded");

    // Stage 3: Load history
    let data_dir = resolve_data_dir(data_dir_override, &adapter);
    let mut history = CsvHistory::new(data_dir);
    match history.load_symbol(&bt_config.symbol) {
        Ok(count) => info!(bars = count, "history loaded"),
        Err(e) => return report(&e),
    }

    // Stage 4: Replay
    let mut broker = PaperBroker::new(bt_config.initial_capital);
    let mut algorithm = BreakoutAlgorithm::new(bt_config.symbol.clone(), params);
    let telemetry_path = telemetry_override
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("telemetry", "output").map(PathBuf::from));

    let result = match telemetry_path {
        Some(path) => {
            let mut sink = match CsvTelemetry::create(&path) {
                Ok(s) => s,
                Err(e) => return report(&e),
            };
            let summary = run_replay(
                &mut history,
                &mut broker,
                &mut sink,
                &mut algorithm,
                &bt_config,
                state,
            );
            if let Err(e) = sink.flush() {
                return report(&e);
            }
            eprintln!(
                "Telemetry written to: {} ({} points)",
                path.display(),
                sink.rows()
            );
            summary
        }
        None => run_replay(
            &mut history,
            &mut broker,
            &mut TracingTelemetry,
            &mut algorithm,
            &bt_config,
            state,
        ),
    };

    match result {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

fn print_summary(summary: &ReplaySummary) {
    eprintln!("\n=== Results ===");
    eprintln!("Final Equity:     {:.2}", summary.final_equity);
    eprintln!("Total Return:     {:.2}%", summary.total_return() * 100.0);
    eprintln!("Total Trades:     {}", summary.trades.len());
    eprintln!("Ticks:            {} ({} skipped)", summary.ticks, summary.skipped);
    eprintln!("Final Lookback:   {}", summary.final_lookback());

    if !summary.trades.is_empty() {
        eprintln!("\n=== Trades ===");
        for t in &summary.trades {
            let pnl_sign = if t.pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {} -> {}  {} x {:.2} -> {:.2}  {}${:.0}",
                t.entry_date, t.exit_date, t.quantity, t.entry_price, t.exit_price, pnl_sign, t.pnl,
            );
        }
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, BreakoutError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;
    let symbol = adapter
        .get_string("backtest", "symbol")
        .ok_or_else(|| BreakoutError::config_missing("backtest", "symbol"))?;
    let minutes_after_open =
        adapter.get_int("backtest", "minutes_after_open", DEFAULT_MINUTES_AFTER_OPEN);
    let minutes_after_open = u32::try_from(minutes_after_open).map_err(|_| {
        BreakoutError::config_invalid(
            "backtest",
            "minutes_after_open",
            "minutes_after_open must not be negative",
        )
    })?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        symbol,
        minutes_after_open,
    })
}

/// Read `[strategy]`, falling back to the reference defaults. Run
/// `validate_strategy_config` first; out-of-range values are caught again
/// by `StrategyParams::initial_state`.
pub fn build_strategy_params(adapter: &dyn ConfigPort) -> StrategyParams {
    let get_usize = |key: &str, default: usize| -> usize {
        usize::try_from(adapter.get_int("strategy", key, default as i64)).unwrap_or(default)
    };

    StrategyParams {
        name: adapter
            .get_string("strategy", "name")
            .unwrap_or_else(|| StrategyParams::default().name),
        initial_lookback: get_usize("lookback", DEFAULT_LOOKBACK),
        bounds: LookbackBounds {
            floor: get_usize("floor", DEFAULT_FLOOR),
            ceiling: get_usize("ceiling", DEFAULT_CEILING),
        },
        history_bars: get_usize("history_bars", DEFAULT_HISTORY_BARS),
        risk: StopRisk {
            initial: adapter.get_double("strategy", "initial_stop_risk", DEFAULT_INITIAL_STOP_RISK),
            trailing: adapter.get_double(
                "strategy",
                "trailing_stop_risk",
                DEFAULT_TRAILING_STOP_RISK,
            ),
        },
        allocation: adapter.get_double("strategy", "allocation", 1.0),
    }
}

/// `build_backtest_config` with the command-line symbol applied.
pub fn resolve_backtest_config(
    adapter: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<BacktestConfig, BreakoutError> {
    let mut config = build_backtest_config(adapter)?;
    if let Some(symbol) = resolve_symbol(symbol_override, adapter) {
        config.symbol = symbol;
    }
    Ok(config)
}

pub fn resolve_symbol(symbol_override: Option<&str>, adapter: &dyn ConfigPort) -> Option<String> {
    symbol_override
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .or_else(|| adapter.get_string("backtest", "symbol"))
}

pub fn resolve_data_dir(data_dir_override: Option<&Path>, adapter: &dyn ConfigPort) -> PathBuf {
    data_dir_override
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("backtest", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn run_dry_run(
    config_path: &Path,
    symbol_override: Option<&str>,
    data_dir_override: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return report(&e);
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        return report(&e);
    }
    eprintln!("Config validated successfully");

    let bt_config = match resolve_backtest_config(&adapter, symbol_override) {
        Ok(c) => c,
        Err(e) => return report(&e),
    };
    let params = build_strategy_params(&adapter);

    eprintln!("\nBacktest:");
    eprintln!("  symbol:          {}", bt_config.symbol);
    eprintln!("  period:          {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  initial capital: {:.2}", bt_config.initial_capital);
    eprintln!("  tick:            {} min after open", bt_config.minutes_after_open);
    eprintln!(
        "  data dir:        {}",
        resolve_data_dir(data_dir_override, &adapter).display()
    );

    eprintln!("\nStrategy: {}", params.name);
    eprintln!(
        "  lookback:        {} in [{}, {}]",
        params.initial_lookback, params.bounds.floor, params.bounds.ceiling
    );
    eprintln!("  history bars:    {}", params.history_bars);
    eprintln!("  initial stop:    {:.2} x breakout", params.risk.initial);
    eprintln!("  trailing stop:   {:.2} x close", params.risk.trailing);
    eprintln!("  allocation:      {:.2}", params.allocation);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return report(&e);
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        return report(&e);
    }
    if let Err(e) = build_strategy_params(&adapter).initial_state() {
        return report(&e);
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, symbol_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut history = CsvHistory::new(resolve_data_dir(None, &adapter));

    // Without a symbol, list what the data directory holds.
    let Some(symbol) = resolve_symbol(symbol_override, &adapter) else {
        return match history.list_symbols() {
            Ok(symbols) if !symbols.is_empty() => {
                for symbol in &symbols {
                    println!("{}", symbol);
                }
                eprintln!("{} symbols found", symbols.len());
                ExitCode::SUCCESS
            }
            Ok(_) => report(&BreakoutError::config_missing("backtest", "symbol")),
            Err(e) => report(&e),
        };
    };

    if let Err(e) = history.load_symbol(&symbol) {
        return report(&e);
    }

    match history.data_range(&symbol) {
        Ok(Some((first, last, count))) => {
            println!("{}: {} bars, {} to {}", symbol, count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => report(&BreakoutError::NoData { symbol }),
        Err(e) => report(&e),
    }
}
