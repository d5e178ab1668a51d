//! CLI entry point for the population dashboard.
//!
//! Provides subcommands for a one-off analysis in the terminal (with
//! optional CSV export) and for serving the browser dashboard.

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use population_dashboard::analysis::{analyze_population_trends, filter_by_growth_rate};
use population_dashboard::api::{WorldBankClient, calculate_growth_rate};
use population_dashboard::config::{ClientConfig, DashboardConfig};
use population_dashboard::dashboard;
use population_dashboard::output::{export_to_csv, export_to_csv_gz, print_json, print_pretty};
use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "population_dashboard")]
#[command(about = "Fetch, analyze and visualize World Bank population data", long_about = None)]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ClientArgs {
    /// API base URL (defaults to POPULATION_API_BASE or the World Bank API)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Requests allowed per time window
    #[arg(long, global = true, default_value_t = 10)]
    rate_limit: u32,

    /// Length of the rate limit window in seconds
    #[arg(long, global = true, default_value_t = 1)]
    time_window_secs: u64,

    /// Retries for 429/5xx responses and transport errors
    #[arg(long, global = true, default_value_t = 3)]
    max_retries: u32,

    /// Year requests kept in flight at once
    #[arg(long, global = true, default_value_t = 10)]
    concurrency: usize,
}

impl ClientArgs {
    fn into_config(self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        config.rate_limit = self.rate_limit;
        config.time_window = Duration::from_secs(self.time_window_secs);
        config.max_retries = self.max_retries;
        config.concurrency = self.concurrency;
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a country's population range and print the analysis
    Analyze {
        /// ISO country code, e.g. USA, CHN, IND
        #[arg(value_name = "COUNTRY")]
        country: String,

        #[arg(short, long, default_value_t = 2000)]
        start: i32,

        #[arg(short, long, default_value_t = 2023)]
        end: i32,

        /// Only print and export years with at least this growth rate (percent)
        #[arg(long, allow_negative_numbers = true)]
        min_growth: Option<f64>,

        /// Only print and export years with at most this growth rate (percent)
        #[arg(long, allow_negative_numbers = true)]
        max_growth: Option<f64>,

        /// CSV file to export the series to
        #[arg(short, long)]
        output: Option<String>,

        /// Gzip compress the exported CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Serve the browser dashboard
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/population_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("population_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let client_config = cli.client.into_config();
    info!(
        base_url = %client_config.base_url,
        rate_limit = client_config.rate_limit,
        time_window_secs = client_config.time_window.as_secs(),
        "API client configured"
    );
    let api = WorldBankClient::from_config(&client_config)?;

    match cli.command {
        Commands::Analyze {
            country,
            start,
            end,
            min_growth,
            max_growth,
            output,
            gzip,
        } => {
            let country = country.trim().to_uppercase();
            if start > end {
                bail!("start year {start} is after end year {end}");
            }

            let data = calculate_growth_rate(&api, &country, start, end).await;
            if data.is_empty() {
                bail!("No data available for {country} between {start} and {end}");
            }
            print_pretty(&data);

            let analysis = analyze_population_trends(&data)?;
            print_json(&analysis)?;

            let selected = filter_by_growth_rate(&data, min_growth, max_growth);
            if min_growth.is_some() || max_growth.is_some() {
                info!(
                    kept = selected.len(),
                    total = data.len(),
                    "Filtered by growth rate"
                );
                print_json(&selected)?;
            }

            match output {
                Some(path) if gzip => export_to_csv_gz(&path, &selected)?,
                Some(path) => export_to_csv(&path, &selected)?,
                None if gzip => warn!("--gzip has no effect without --output"),
                None => {}
            }
        }
        Commands::Serve { addr } => {
            let config = DashboardConfig {
                addr,
                ..Default::default()
            };
            dashboard::serve(Arc::new(api), config).await?;
        }
    }

    Ok(())
}
