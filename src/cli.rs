//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_many, BacktestResult};
use crate::domain::compiler::{parse_document, Compiler};
use crate::domain::config_validation::{
    data_dir, log_level, max_depth, strategy_path, symbols, validate_backtest_config,
    validate_data_config, DEFAULT_LOG_LEVEL,
};
use crate::domain::error::QuantscreenError;
use crate::domain::provider::DataProvider;
use crate::domain::screen::{screen, ScreenResult};
use crate::domain::strategy::Strategy;
use crate::domain::universe::load_universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser, Debug)]
#[command(name = "quantscreen", about = "Indicator screening and strategy backtesting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the configured strategy over each symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List symbols whose newest quote passes a filter
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        filter: PathBuf,
    },
    /// Compile a strategy document without running it
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Print per-index values of a method as CSV
    Export {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        method: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(&cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Run `command`, writing its report to `out`.
pub fn execute(command: &Command, out: &mut dyn Write) -> Result<(), QuantscreenError> {
    match command {
        Command::Backtest { config, symbol } => run_backtest(config, symbol.as_deref(), out),
        Command::Screen { config, filter } => run_screen(config, filter, out),
        Command::Validate { strategy } => run_validate(strategy, out),
        Command::Export {
            config,
            symbol,
            method,
        } => run_export(config, symbol, method, out),
    }
}

/// Install the global subscriber once; `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Paths in a config file are relative to the file's directory.
fn resolve(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match config_path.parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

fn read_document(path: &Path) -> Result<serde_json::Value, QuantscreenError> {
    let text = fs::read_to_string(path)?;
    parse_document(&text, &path.display().to_string())
}

fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantscreenError> {
    let config = FileConfigAdapter::from_file(path)?;
    init_logging(&log_level(&config)?);
    Ok(config)
}

fn resolve_symbols(config: &dyn ConfigPort, data: &dyn DataPort) -> Result<Vec<String>, QuantscreenError> {
    match symbols(config)? {
        Some(list) => Ok(list),
        None => data.list_symbols(),
    }
}

pub fn run_backtest(config_path: &Path, symbol: Option<&str>, out: &mut dyn Write) -> Result<(), QuantscreenError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;

    let compiler = Compiler::new(max_depth(&config)?);
    let strategy_file = resolve(config_path, strategy_path(&config)?);
    let text = fs::read_to_string(&strategy_file)?;
    let strategy = compiler.parse_strategy(&text, &strategy_file.display().to_string())?;

    let data = CsvAdapter::new(resolve(config_path, data_dir(&config)?));
    let symbols = match symbol {
        Some(s) => vec![s.trim().to_uppercase()],
        None => resolve_symbols(&config, &data)?,
    };
    let universe = load_universe(&data, &symbols)?;

    writeln!(out, "Strategy: {}", strategy.name)?;
    for result in run_many(&universe.assets, &strategy) {
        write_backtest_report(out, &result?)?;
    }
    Ok(())
}

pub fn write_backtest_report(out: &mut dyn Write, result: &BacktestResult) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "=== {} ({} bars, {} trades, {} skipped evaluations) ===",
        result.symbol,
        result.bars,
        result.trades.len(),
        result.skipped
    )?;

    if !result.trades.is_empty() {
        writeln!(
            out,
            "{:<20} {:>12} {:<20} {:>12} {:>12} {:>6}",
            "entry", "price", "exit", "price", "profit", "bars"
        )?;
        for trade in &result.trades {
            writeln!(
                out,
                "{:<20} {:>12.4} {:<20} {:>12.4} {:>12.4} {:>6}",
                trade.entry_time.format(TIMESTAMP_FORMAT),
                trade.entry_price,
                trade.exit_time.format(TIMESTAMP_FORMAT),
                trade.exit_price,
                trade.profit,
                trade.holding_bars()
            )?;
        }
    }

    if let Some(open) = &result.open_position {
        writeln!(
            out,
            "Open position:    entered {} at {:.4}",
            open.entry_time.format(TIMESTAMP_FORMAT),
            open.entry_price
        )?;
    }

    let m = &result.metrics;
    writeln!(out, "Total Trades:     {}", m.total_trades)?;
    writeln!(
        out,
        "Won/Lost/Even:    {}/{}/{}",
        m.trades_won, m.trades_lost, m.trades_breakeven
    )?;
    writeln!(out, "Win Rate:         {:.1}%", m.win_rate * 100.0)?;
    writeln!(out, "Total Profit:     {:.4}", m.total_profit)?;
    writeln!(out, "Compounded:       {:.2}%", m.compounded_return * 100.0)?;
    writeln!(out, "Avg Win/Loss:     {:.4} / {:.4}", m.avg_win, m.avg_loss)?;
    writeln!(out, "Largest Win/Loss: {:.4} / {:.4}", m.largest_win, m.largest_loss)?;
    writeln!(out, "Profit Factor:    {:.2}", m.profit_factor)?;
    writeln!(out, "Avg Holding:      {:.1} bars", m.avg_holding_bars)?;
    writeln!(out, "Max Drawdown:     {:.4}", m.max_drawdown)?;
    Ok(())
}

pub fn run_screen(config_path: &Path, filter_path: &Path, out: &mut dyn Write) -> Result<(), QuantscreenError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;

    let compiler = Compiler::new(max_depth(&config)?);
    let filter = compiler.compile_filter(&read_document(filter_path)?)?;

    let data = CsvAdapter::new(resolve(config_path, data_dir(&config)?));
    let symbols = resolve_symbols(&config, &data)?;
    let universe = load_universe(&data, &symbols)?;

    let result = screen(&universe.assets, &filter);
    write_screen_report(out, &result)?;
    Ok(())
}

pub fn write_screen_report(out: &mut dyn Write, result: &ScreenResult) -> io::Result<()> {
    for symbol in &result.passed {
        writeln!(out, "{}", symbol)?;
    }
    if !result.ineligible.is_empty() {
        writeln!(out)?;
        writeln!(out, "Ineligible:")?;
        for failure in &result.ineligible {
            writeln!(out, "  {}: {}", failure.symbol, failure.reason)?;
        }
    }
    Ok(())
}

pub fn run_validate(path: &Path, out: &mut dyn Write) -> Result<(), QuantscreenError> {
    init_logging(DEFAULT_LOG_LEVEL);
    let text = fs::read_to_string(path)?;
    let strategy = Compiler::default().parse_strategy(&text, &path.display().to_string())?;
    write_strategy_summary(out, &strategy)?;
    Ok(())
}

pub fn write_strategy_summary(out: &mut dyn Write, strategy: &Strategy) -> io::Result<()> {
    writeln!(out, "Strategy: {}", strategy.name)?;
    if !strategy.description.is_empty() {
        writeln!(out, "  {}", strategy.description)?;
    }
    writeln!(out, "Entry:   {}", strategy.entry)?;
    writeln!(out, "Price:   {}", strategy.price)?;
    for exit in &strategy.exits {
        writeln!(out, "Exit:    {}", exit)?;
    }
    writeln!(out, "Methods:")?;
    for method in strategy.methods() {
        writeln!(out, "  {}", method)?;
    }
    writeln!(out, "Strategy is valid")?;
    Ok(())
}

pub fn run_export(
    config_path: &Path,
    symbol: &str,
    method_path: &Path,
    out: &mut dyn Write,
) -> Result<(), QuantscreenError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;

    let compiler = Compiler::new(max_depth(&config)?);
    let method = compiler.compile_method(&read_document(method_path)?)?;

    let symbol = symbol.trim().to_uppercase();
    let data = CsvAdapter::new(resolve(config_path, data_dir(&config)?));
    let asset = data.load_asset(&symbol)?;
    let provider = DataProvider::new(&asset);
    let values = method
        .per_index_values(provider)
        .map_err(|source| QuantscreenError::Evaluation {
            symbol: symbol.clone(),
            source,
        })?;

    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["index", "timestamp", "value"])
        .map_err(io::Error::from)?;
    for (index, value) in values.iter().enumerate() {
        let timestamp = asset
            .quote(index)
            .map(|q| q.timestamp.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([index.to_string(), timestamp, value])
            .map_err(io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}
