//! CLI entry point for the San Francisco housing analysis.
//!
//! Provides subcommands for the full terminal report, the per-neighborhood
//! view and exporting the derived tables.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sfo_housing_analysis::config::{AnalysisConfig, ConfigOverrides};
use sfo_housing_analysis::fetch::BasicClient;
use sfo_housing_analysis::output::{export_all, print_pretty};
use sfo_housing_analysis::pipeline::{RunOutput, run};
use sfo_housing_analysis::plot::{
    DEFAULT_HEIGHT, DEFAULT_WIDTH, render_neighborhood_prices, render_neighborhood_rent_to_price,
};
use sfo_housing_analysis::records::DuplicatePolicy;
use sfo_housing_analysis::report::{format_neighborhood_prices, format_report};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "sfo_housing_analysis")]
#[command(about = "Rents and sale prices across San Francisco neighborhoods", long_about = None)]
struct Cli {
    #[command(flatten)]
    sources: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Observation CSV: file path or URL [env: SFO_DATA_SOURCE]
    #[arg(long, global = true, value_name = "FILE_OR_URL")]
    data: Option<String>,

    /// Coordinate CSV: file path or URL [env: SFO_COORDINATES_SOURCE]
    #[arg(long, global = true, value_name = "FILE_OR_URL")]
    coordinates: Option<String>,

    /// What to do with a neighborhood listed twice in the coordinates [env: SFO_DUPLICATE_POLICY]
    #[arg(long, global = true, value_enum)]
    duplicates: Option<DuplicatePolicy>,
}

#[derive(Args)]
struct ChartSize {
    /// Chart width in characters
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Chart height in rows
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the run summary, every table, the highlights and the charts
    Report {
        /// Also show this neighborhood's prices
        #[arg(short, long)]
        neighborhood: Option<String>,

        #[command(flatten)]
        size: ChartSize,

        /// Tables only
        #[arg(long, default_value_t = false)]
        no_charts: bool,
    },
    /// List the neighborhoods available to `neighborhood`
    Neighborhoods,
    /// Show one neighborhood's prices and rent-to-price ratio by year
    Neighborhood {
        #[arg(value_name = "NAME")]
        name: String,

        #[command(flatten)]
        size: ChartSize,
    },
    /// Write the derived tables as CSV and the whole run as JSON
    Export {
        /// Output directory [env: SFO_EXPORT_DIR]
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/sfo_housing_analysis.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("sfo_housing_analysis.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let export_dir = match &cli.command {
        Commands::Export { dir } => dir.clone(),
        _ => None,
    };
    let config = AnalysisConfig::from_env()
        .context("reading configuration from the environment")?
        .with_overrides(ConfigOverrides {
            data_source: cli.sources.data,
            coordinates_source: cli.sources.coordinates,
            duplicate_policy: cli.sources.duplicates,
            export_dir,
        });
    print_pretty(&config);

    let client = BasicClient::new();
    let output = run(&config, &client).context("housing analysis failed")?;

    match cli.command {
        Commands::Report {
            neighborhood,
            size,
            no_charts,
        } => {
            print_report(&config, &output, !no_charts, &size);
            if let Some(name) = neighborhood {
                print_neighborhood(&output, &name, &size)?;
            }
        }
        Commands::Neighborhoods => {
            for name in output.analysis.neighborhood_partitions().keys() {
                println!("{name}");
            }
        }
        Commands::Neighborhood { name, size } => {
            print_neighborhood(&output, &name, &size)?;
        }
        Commands::Export { .. } => {
            let written = export_all(&config.export_dir, &output)
                .with_context(|| format!("exporting to {}", config.export_dir.display()))?;
            for path in &written {
                println!("{}", path.display());
            }
            info!(dir = %config.export_dir.display(), files = written.len(), "Export finished");
        }
    }

    Ok(())
}

/// Filter from `var`, falling back to `default` when unset or unparsable.
fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

fn print_report(config: &AnalysisConfig, output: &RunOutput, charts: bool, size: &ChartSize) {
    let chart_size = charts.then_some((size.width, size.height));
    print!("{}", format_report(config, output, chart_size));
}

fn print_neighborhood(output: &RunOutput, name: &str, size: &ChartSize) -> Result<()> {
    let Some(rows) = output.analysis.neighborhood_series(name) else {
        bail!("no observations for neighborhood `{name}`; run `neighborhoods` to list valid names");
    };

    println!("{}", format_neighborhood_prices(&rows));
    println!(
        "{}",
        render_neighborhood_prices(name, &rows, size.width, size.height)
    );
    println!(
        "{}",
        render_neighborhood_rent_to_price(name, &rows, size.width, size.height)
    );
    Ok(())
}
