//! CLI tool for computing sales indicators
//! Usage: insights <command> [options] < input.json > output.json
//!
//! Indicator commands read a JSON array of numbers; `normalize` and `chart`
//! read a JSON array of sales rows. Warm-up slots are written as `null`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use bakery_insights::common::nan_as_null;
use bakery_insights::logging::setup_logging;
use bakery_insights::oscillators::{DEFAULT_RSI_PERIOD, DEFAULT_RSI_SCALE};
use bakery_insights::{
    ema, linear_trend, normalize, overall_trend, percent_changes, scaled_rsi, sma, ChartBuilder, ChartOptions,
    SalesObservation, TrendLine,
};

#[derive(Parser)]
#[command(name = "insights")]
#[command(about = "Bakery sales indicators from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simple moving average
    Sma {
        #[arg(short, long, default_value_t = 7)]
        period: usize,
    },
    /// Exponential moving average
    Ema {
        #[arg(short, long, default_value_t = 14)]
        period: usize,
    },
    /// Wilder RSI rescaled to 0..max-scale
    Rsi {
        #[arg(short, long, default_value_t = DEFAULT_RSI_PERIOD)]
        period: usize,
        #[arg(short, long, default_value_t = DEFAULT_RSI_SCALE)]
        max_scale: f64,
    },
    /// Least-squares trend line, day-over-day and overall change
    Trend,
    /// Gap-fill sales rows into a daily series
    Normalize,
    /// Build the chart configuration for sales rows
    Chart {
        /// JSON file with chart options
        #[arg(short, long)]
        options: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Series {
    #[serde(serialize_with = "nan_as_null::serialize")]
    result: Vec<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendOutput {
    trend: TrendLine,
    percent_changes: Vec<f64>,
    overall_trend: f64,
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    Ok(input)
}

fn read_values() -> Result<Vec<f64>> {
    serde_json::from_str(&read_stdin()?).context("Input must be a JSON array of numbers")
}

fn read_rows() -> Result<Vec<SalesObservation>> {
    serde_json::from_str(&read_stdin()?).context("Input must be a JSON array of sales rows")
}

fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string(value).context("Failed to serialize output")?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Sma { period } => {
            let values = read_values()?;
            write_json(&Series { result: sma(&values, period)? })
        }
        Commands::Ema { period } => {
            let values = read_values()?;
            write_json(&Series { result: ema(&values, period)? })
        }
        Commands::Rsi { period, max_scale } => {
            let values = read_values()?;
            write_json(&Series { result: scaled_rsi(&values, period, max_scale)? })
        }
        Commands::Trend => {
            let values = read_values()?;
            write_json(&TrendOutput {
                trend: linear_trend(&values),
                percent_changes: percent_changes(&values),
                overall_trend: overall_trend(&values),
            })
        }
        Commands::Normalize => {
            let rows = read_rows()?;
            let series = normalize(&rows);
            tracing::debug!(rows = rows.len(), days = series.len(), "normalized");
            write_json(&series)
        }
        Commands::Chart { options } => {
            let options: ChartOptions = match options {
                Some(path) => {
                    let contents = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read options file {}", path.display()))?;
                    serde_json::from_str(&contents).context("Failed to parse chart options")?
                }
                None => ChartOptions::default(),
            };
            let rows = read_rows()?;
            let series = normalize(&rows);
            let config = ChartBuilder::new(&series, &options).build()?;
            write_json(&config)
        }
    }
}
