//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{
    self as backtest_runner, BacktestConfig, BacktestRequest, DEFAULT_COMMISSION,
    DEFAULT_INITIAL_CASH,
};
use crate::domain::broker::PositionSizing;
use crate::domain::condition_eval::{evaluate_condition, EvaluationContext};
use crate::domain::condition_parser;
use crate::domain::config_validation::{
    parse_date, read_double, read_int, validate_backtest_config, validate_rule_config,
};
use crate::domain::error::RuletraderError;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::Bar;
use crate::domain::strategy::RuleSpec;
use crate::domain::sweep::{parse_periods, run_sweep};
use crate::domain::trade_tracker::BacktestSummary;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(
    name = "ruletrader",
    about = "Backtest an IF/THEN/ELSE rule against a simple moving average"
)]
pub struct Cli {
    /// Log at debug level, including one line per processed bar
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        sma_period: Option<usize>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Write a JSON report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and its rule
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run one backtest per SMA period in parallel
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma separated periods, e.g. 5,10,20
        #[arg(long)]
        periods: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Evaluate a condition once against the given values
    Eval {
        #[arg(long)]
        condition: String,
        #[arg(long, allow_hyphen_values = true)]
        price: f64,
        #[arg(long, allow_hyphen_values = true)]
        sma: f64,
    },
    /// List tickers available in the data directory
    ListTickers {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// Install the global subscriber. `RUST_LOG` wins unless `verbose` is set.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            ticker,
            sma_period,
            data_dir,
            output,
        } => run_backtest(
            &config,
            &Overrides {
                ticker,
                sma_period,
                data_dir,
                output,
            },
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Sweep {
            config,
            periods,
            data_dir,
        } => run_sweep_command(
            &config,
            &periods,
            &Overrides {
                data_dir,
                ..Overrides::default()
            },
        ),
        Command::Eval {
            condition,
            price,
            sma,
        } => run_eval(&condition, price, sma),
        Command::ListTickers { config, data_dir } => run_list_tickers(config.as_ref(), data_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub ticker: Option<String>,
    pub sma_period: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, adapter: &mut FileConfigAdapter) {
        if let Some(ticker) = &self.ticker {
            adapter.set("backtest", "ticker", ticker.as_str());
        }
        if let Some(period) = self.sma_period {
            adapter.set("backtest", "sma_period", period.to_string());
        }
        if let Some(dir) = &self.data_dir {
            adapter.set("data", "csv_dir", dir.display().to_string());
        }
        if let Some(output) = &self.output {
            adapter.set("report", "output", output.display().to_string());
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, RuletraderError> {
    FileConfigAdapter::from_file(path).map_err(|e| RuletraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load, override and validate a config file in one go.
fn load_validated(
    path: &PathBuf,
    overrides: &Overrides,
) -> Result<FileConfigAdapter, RuletraderError> {
    info!(path = %path.display(), "loading config");
    let mut adapter = load_config(path)?;
    overrides.apply(&mut adapter);
    validate_backtest_config(&adapter)?;
    validate_rule_config(&adapter)?;
    Ok(adapter)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, RuletraderError> {
    let sma_period = read_int(adapter, "backtest", "sma_period", 0)?;
    let sma_period = usize::try_from(sma_period)
        .ok()
        .filter(|p| *p >= 1)
        .ok_or_else(|| RuletraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "sma_period".into(),
            reason: format!("sma_period must be a positive integer, got {}", sma_period),
        })?;

    let sizing = match adapter
        .get_string("backtest", "sizing")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("all_in") => PositionSizing::AllIn,
        Some("units") => {
            let units = read_int(adapter, "backtest", "sizing_units", 1)?;
            PositionSizing::Units(u64::try_from(units).unwrap_or(0))
        }
        Some("fraction") => {
            PositionSizing::CashFraction(read_double(adapter, "backtest", "sizing_fraction", 1.0)?)
        }
        Some(other) => {
            return Err(RuletraderError::ConfigInvalid {
                section: "backtest".into(),
                key: "sizing".into(),
                reason: format!("unknown sizing '{}'", other),
            });
        }
    };

    Ok(BacktestConfig {
        initial_cash: read_double(adapter, "backtest", "initial_cash", DEFAULT_INITIAL_CASH)?,
        commission_rate: read_double(adapter, "backtest", "commission", DEFAULT_COMMISSION)?,
        sma_period,
        sizing,
    })
}

pub fn build_rule(adapter: &dyn ConfigPort) -> Result<RuleSpec, RuletraderError> {
    let defaults = RuleSpec::default();
    let if_condition = adapter
        .get_string("rule", "if_condition")
        .unwrap_or(defaults.if_condition);
    let then_token = adapter
        .get_string("rule", "then")
        .unwrap_or_else(|| defaults.then_action.to_string());
    let else_token = adapter
        .get_string("rule", "else")
        .unwrap_or_else(|| defaults.else_action.to_string());

    RuleSpec::from_tokens(&if_condition, &then_token, &else_token)
}

pub fn build_request(adapter: &dyn ConfigPort) -> Result<BacktestRequest, RuletraderError> {
    let ticker = adapter
        .get_string("backtest", "ticker")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RuletraderError::ConfigMissing {
            section: "backtest".into(),
            key: "ticker".into(),
        })?;

    Ok(BacktestRequest {
        ticker,
        start_date: parse_date(
            adapter.get_string("backtest", "start_date").as_deref(),
            "start_date",
        )?,
        end_date: parse_date(
            adapter.get_string("backtest", "end_date").as_deref(),
            "end_date",
        )?,
        rule: build_rule(adapter)?,
        config: build_backtest_config(adapter)?,
    })
}

fn data_dir(adapter: &dyn ConfigPort) -> PathBuf {
    adapter
        .get_string("data", "csv_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn fetch(data_port: &dyn DataPort, request: &BacktestRequest) -> Result<Vec<Bar>, RuletraderError> {
    let bars = data_port.fetch_bars(&request.ticker, request.start_date, request.end_date)?;
    info!(
        ticker = %request.ticker,
        bars = bars.len(),
        start = %request.start_date,
        end = %request.end_date,
        "fetched bars"
    );
    Ok(bars)
}

pub fn run_backtest(config_path: &PathBuf, overrides: &Overrides) -> Result<(), RuletraderError> {
    let adapter = load_validated(config_path, overrides)?;
    let request = build_request(&adapter)?;
    let output = adapter.get_string("report", "output");
    let show_trades = adapter.get_bool("report", "show_trades", true);

    let data_port = CsvAdapter::new(data_dir(&adapter));
    let report_port = JsonReportAdapter::new();

    run_backtest_pipeline(
        &data_port,
        &report_port,
        &request,
        output.as_deref(),
        show_trades,
    )
}

/// Fetch, simulate, print and optionally persist one backtest.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    request: &BacktestRequest,
    output_path: Option<&str>,
    show_trades: bool,
) -> Result<(), RuletraderError> {
    let bars = fetch(data_port, request)?;
    let summary = backtest_runner::run_backtest(&bars, &request.rule, &request.config)?;
    let metrics = Metrics::compute(&summary);

    print!("{}", format_summary(request, &summary, &metrics, show_trades));

    if let Some(path) = output_path {
        report_port.write(request, &summary, &metrics, path)?;
        println!("\nReport written to: {}", path);
    }
    Ok(())
}

pub fn format_summary(
    request: &BacktestRequest,
    summary: &BacktestSummary,
    metrics: &Metrics,
    show_trades: bool,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} {} to {} ===\n",
        request.ticker, request.start_date, request.end_date
    ));
    out.push_str(&format!("Rule:             {}\n", request.rule));
    out.push_str(&format!("SMA Period:       {}\n", request.config.sma_period));
    out.push_str(&format!("Initial Cash:     {:.2}\n", request.config.initial_cash));
    out.push_str(&format!("Final Value:      {:.2}\n", summary.final_value));
    out.push_str(&format!("Total Return:     {:.2}%\n", summary.total_return_pct));
    out.push_str(&format!("Total Trades:     {}\n", summary.total_trades));
    out.push_str(&format!(
        "Win Rate:         {:.2}% ({} won, {} lost)\n",
        summary.win_rate, summary.winning_trades, summary.losing_trades
    ));
    out.push_str(&format!("Max Drawdown:     -{:.2}%\n", metrics.max_drawdown * 100.0));
    out.push_str(&format!("Sharpe Ratio:     {:.2}\n", metrics.sharpe_ratio));
    out.push_str(&format!("Profit Factor:    {:.2}\n", metrics.profit_factor));
    out.push_str(&format!("Avg Holding Days: {:.1}\n", metrics.avg_holding_days));

    if show_trades && !summary.trade_history.is_empty() {
        out.push_str("\n=== Trades ===\n");
        for trade in &summary.trade_history {
            let sign = if trade.pnl >= 0.0 { "+" } else { "" };
            out.push_str(&format!(
                "  {} -> {}  {} @ {:.2} -> {:.2}  {}{:.2} ({}{:.2}%)  {}\n",
                trade.entry_date,
                trade.exit_date,
                trade.size,
                trade.entry_price,
                trade.exit_price,
                sign,
                trade.pnl,
                sign,
                trade.pnl_pct,
                trade.status,
            ));
        }
    }
    out
}

pub fn run_validate(config_path: &PathBuf) -> Result<(), RuletraderError> {
    let adapter = load_validated(config_path, &Overrides::default())?;
    let request = build_request(&adapter)?;

    println!("Ticker:    {}", request.ticker);
    println!("Range:     {} to {}", request.start_date, request.end_date);
    println!("SMA:       {}", request.config.sma_period);
    println!("Sizing:    {:?}", request.config.sizing);

    let text = &request.rule.if_condition;
    match condition_parser::parse(text) {
        Ok(condition) => {
            println!("Condition: {}", condition);
            println!("Raw:       {}", text);
            println!("Then:      {}", request.rule.then_action);
            println!("Else:      {}", request.rule.else_action);
            println!("\nConfiguration is valid.");
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.display_with_context(text));
            Err(e.into())
        }
    }
}

pub fn run_sweep_command(
    config_path: &PathBuf,
    periods: &str,
    overrides: &Overrides,
) -> Result<(), RuletraderError> {
    let periods = parse_periods(periods)?;
    let adapter = load_validated(config_path, overrides)?;
    let request = build_request(&adapter)?;
    let data_port = CsvAdapter::new(data_dir(&adapter));
    let bars = fetch(&data_port, &request)?;

    info!(runs = periods.len(), "starting sweep");
    let results = run_sweep(&bars, &request.rule, &request.config, &periods);

    println!(
        "{:>6}  {:>10}  {:>6}  {:>8}  {:>14}",
        "period", "return %", "trades", "win %", "final value"
    );
    for result in &results {
        match &result.outcome {
            Ok(summary) => println!(
                "{:>6}  {:>10.2}  {:>6}  {:>8.2}  {:>14.2}",
                result.sma_period,
                summary.total_return_pct,
                summary.total_trades,
                summary.win_rate,
                summary.final_value
            ),
            Err(e) => println!("{:>6}  error: {}", result.sma_period, e),
        }
    }
    Ok(())
}

pub fn run_eval(condition: &str, price: f64, sma: f64) -> Result<(), RuletraderError> {
    let parsed = condition_parser::parse(condition).map_err(|e| {
        eprintln!("{}", e.display_with_context(condition));
        RuletraderError::from(e)
    })?;
    let ctx = EvaluationContext {
        price,
        sma,
        position_size: 0,
    };
    println!("{}", evaluate_condition(&parsed, &ctx));
    Ok(())
}

pub fn run_list_tickers(
    config_path: Option<&PathBuf>,
    data_dir_flag: Option<PathBuf>,
) -> Result<(), RuletraderError> {
    let dir = match (data_dir_flag, config_path) {
        (Some(dir), _) => dir,
        (None, Some(path)) => data_dir(&load_config(path)?),
        (None, None) => PathBuf::from(DEFAULT_DATA_DIR),
    };

    let tickers = CsvAdapter::new(dir.clone()).list_tickers()?;
    if tickers.is_empty() {
        eprintln!("No tickers found in {}", dir.display());
    } else {
        for ticker in &tickers {
            println!("{}", ticker);
        }
    }
    Ok(())
}
