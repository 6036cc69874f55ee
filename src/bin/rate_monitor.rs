//! Rate monitor CLI
//!
//! Subcommands:
//!   - `rates`       Aligned US/KR 10Y rates with spread
//!   - `correlation` Rolling correlation windows
//!   - `latest`      Most recent complete quote
//!   - `context`     Numeric context for a summarizer
//!   - `insurer`     Insurer equity duration analysis
//!   - `companies`   Companies available to `insurer`
//!
//! Output is the JSON response envelope unless `--table` is given.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rate_monitor::config::MonitorConfig;
use rate_monitor::data::{DartClient, MarketDataClient, PayloadCache};
use rate_monitor::service::{
    display, AggregationService, ApiResponse, CorrelationPayload, InsurerAnalysis,
    InsurerAnalysisService, RatesPayload,
};
use rate_monitor::{RateError, RateResult};

#[derive(Parser)]
#[command(
    name = "rate_monitor",
    version,
    about = "US/KR 10Y yield spread, correlation and insurer duration",
    propagate_version = true
)]
struct Cli {
    /// JSON config file; defaults plus environment variables when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print a plain-text table instead of JSON
    #[arg(long, global = true)]
    table: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aligned rates and spread over a lookback
    Rates {
        /// Lookback in calendar days, clamped to 1..=365
        #[arg(long)]
        days: Option<u32>,
    },
    /// Rolling correlation windows
    Correlation {
        #[arg(long)]
        days: Option<u32>,
        /// Window length in calendar days
        #[arg(long)]
        window: Option<u32>,
    },
    /// Latest complete US/KR quote
    Latest,
    /// Bounded numeric context for a summarizer
    Context,
    /// Equity duration of a life insurer to 10Y rates
    Insurer {
        /// One of: samsung, hanwha, kyobo, shinhan
        #[arg(long, default_value = "samsung")]
        company: String,
        /// Years of quarterly filings, clamped to 1..=5
        #[arg(long)]
        years: Option<u32>,
    },
    /// Companies available for insurer analysis
    Companies,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[error] {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("[error] {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> RateResult<MonitorConfig> {
    let mut config = match path {
        Some(p) => MonitorConfig::from_json_file(p)?,
        None => MonitorConfig::default(),
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Returns whether the request succeeded
fn run(cli: &Cli, config: MonitorConfig) -> RateResult<bool> {
    let cache = Arc::new(PayloadCache::new(config.cache.stale_grace_secs));

    match &cli.command {
        Commands::Companies => emit(cli.table, Ok(InsurerAnalysisService::company_list()), |list| {
            for c in list {
                println!("{:<10} {}", c.id, c.name);
            }
        }),
        Commands::Insurer { company, years } => {
            let timeout = std::time::Duration::from_secs(config.providers.request_timeout_secs);
            let dart = DartClient::new(config.providers.dart_api_key.clone(), timeout)?;
            let rates = MarketDataClient::from_config(&config.providers)?;
            let years = years.unwrap_or(config.insurer.default_year_count);
            let service = InsurerAnalysisService::new(Arc::new(dart), Arc::new(rates), cache, config);
            emit(cli.table, service.analyze(company, years), print_insurer)
        }
        Commands::Rates { days } => {
            let days = days.unwrap_or(config.rates.default_days);
            let service = aggregation(config, cache)?;
            emit(cli.table, service.get_rates(days), print_rates)
        }
        Commands::Correlation { days, window } => {
            let days = days.unwrap_or(config.rates.default_days);
            let window = window.unwrap_or(config.correlation.default_window_days);
            let service = aggregation(config, cache)?;
            emit(cli.table, service.get_correlation(days, window), print_correlation)
        }
        Commands::Latest => {
            let service = aggregation(config, cache)?;
            emit(cli.table, service.get_latest(), |l| {
                println!("Date:   {}", l.date);
                println!("US 10Y: {:.3}%", l.us_rate);
                println!("KR 10Y: {:.3}%", l.kr_rate);
                println!("Spread: {:.1}bp", l.spread);
            })
        }
        Commands::Context => {
            let service = aggregation(config, cache)?;
            emit(cli.table, service.get_analysis_context(), |c| {
                println!("As of {} ({} days)", c.data_date, c.period_days);
                println!("US change:     {} bp", display(c.us_change_bp, 1));
                println!("KR change:     {} bp", display(c.kr_change_bp, 1));
                println!("Spread change: {} bp", display(c.spread_change_bp, 1));
                println!(
                    "Spread range:  {} .. {} bp",
                    display(c.spread_min_bp, 1),
                    display(c.spread_max_bp, 1)
                );
                println!("Correlation:   {}", display(c.overall_correlation, 4));
            })
        }
    }
}

fn aggregation(config: MonitorConfig, cache: Arc<PayloadCache>) -> RateResult<AggregationService> {
    let provider = MarketDataClient::from_config(&config.providers)?;
    Ok(AggregationService::new(Arc::new(provider), cache, config))
}

/// Print a result as the JSON envelope or, with `table`, through `print`
fn emit<T: Serialize>(table: bool, result: Result<T, RateError>, print: impl FnOnce(&T)) -> RateResult<bool> {
    let response = ApiResponse::from_result(result);
    let ok = response.is_success();

    if table {
        match (&response.data, &response.error) {
            (Some(data), _) => print(data),
            (None, Some(error)) => eprintln!("[error] {}", error),
            (None, None) => {}
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Ok(ok)
}

fn print_rates(p: &RatesPayload) {
    if p.insufficient_data {
        println!("(one source returned no data)");
    }
    println!("{:<12} {:>8} {:>8} {:>10}", "Date", "US 10Y", "KR 10Y", "Spread bp");
    for row in &p.rates {
        println!(
            "{:<12} {:>8} {:>8} {:>10}",
            row.date,
            display(row.us_rate, 3),
            display(row.kr_rate, 3),
            display(row.spread, 1)
        );
    }
    println!("{} rows over {} days", p.count, p.period_days);
}

fn print_correlation(p: &CorrelationPayload) {
    println!("Window {}d, step {}d", p.window_days, p.step_days);
    for w in &p.correlations {
        println!("{:<12} {:>8}", w.period_label, display(w.correlation, 4));
    }
    println!("Overall: {}", display(p.overall_correlation, 4));
}

fn print_insurer(a: &InsurerAnalysis) {
    println!("{}", a.company);
    println!(
        "{:<12} {:>12} {:>8} {:>8} {:>8} {:>8}",
        "Quarter", "Equity 억원", "US 10Y", "KR 10Y", "D(US)", "D(KR)"
    );
    for (i, quarter) in a.quarters.iter().enumerate() {
        let at = |v: &[Option<f64>]| v.get(i).copied().flatten();
        println!(
            "{:<12} {:>12} {:>8} {:>8} {:>8} {:>8}",
            quarter,
            display(at(&a.equity_level), 1),
            display(at(&a.us10y_level), 3),
            display(at(&a.kr10y_level), 3),
            display(at(&a.duration.us10y.series), 2),
            display(at(&a.duration.kr10y.series), 2)
        );
    }
    println!(
        "Median duration: US {} / KR {} ({} quarters)",
        display(a.duration.us10y.summary, 2),
        display(a.duration.kr10y.summary, 2),
        a.analysis_count
    );
}
