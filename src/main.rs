//! ccfslog - CCFS simulation log extractor
//!
//! Turns CCFS controller logs into per-burst CSV files and SVG charts, either
//! one log at a time or over a whole traffic/bandwidth experiment grid.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use ccfslog::batch::run_batch;
use ccfslog::chart::{render_chart, ChartRequest, DEFAULT_X_COLUMN, DEFAULT_Y_COLUMNS};
use ccfslog::settings::{BatchSettings, TrafficMix};
use ccfslog::{extract_with, ExtractOptions};

/// Extract, plot and batch-process CCFS simulation logs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract one CSV row per feedback burst from a simulation log
    Extract {
        /// Simulation log to read
        input: PathBuf,
        /// CSV file to create
        output: PathBuf,
        /// Also write per-packet queueing delays (seq,xod) to this CSV
        #[arg(long)]
        packet_delays: Option<PathBuf>,
    },

    /// Render an extracted CSV as an SVG line chart
    Plot {
        /// Extracted CSV
        csv: PathBuf,
        /// SVG file to create
        output: PathBuf,
        /// Bottleneck bandwidth, sets the y axis range
        #[arg(long)]
        kbps: u32,
        /// Chart title (defaults to the output file stem)
        #[arg(long)]
        title: Option<String>,
        /// X axis column
        #[arg(long, default_value = DEFAULT_X_COLUMN)]
        x: String,
        /// Y axis column, repeatable
        #[arg(long = "y")]
        y: Vec<String>,
    },

    /// Simulate, extract and plot every traffic/bandwidth combination
    Batch {
        /// Settings file (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reuse existing simulation logs
        #[arg(long)]
        skip_simulation: bool,
        /// Override the traffic mixes (pure, tcp, udp)
        #[arg(long, value_parser = parse_traffic)]
        traffic: Vec<TrafficMix>,
        /// Override the bandwidths
        #[arg(long)]
        kbps: Vec<u32>,
    },

    /// Print the effective batch settings
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_traffic(value: &str) -> Result<TrafficMix, String> {
    TrafficMix::from_str(value).map_err(|_| format!("unknown traffic mix '{}'", value))
}

fn load_settings(config: Option<PathBuf>) -> Result<BatchSettings> {
    match config {
        Some(path) => BatchSettings::load_from(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(BatchSettings::load()),
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            packet_delays,
        } => {
            let options = ExtractOptions { packet_delays };
            let report = extract_with(&input, &output, &options)
                .with_context(|| format!("Extraction of {} failed", input.display()))?;

            println!(
                "Input={} FBMCount={} Output={}",
                input.display(),
                report.records,
                output.display()
            );
            if !report.diagnostics.is_empty() {
                println!("{} malformed or incomplete lines reported", report.diagnostics.len());
            }
        }

        Commands::Plot {
            csv,
            output,
            kbps,
            title,
            x,
            y,
        } => {
            let title = title.unwrap_or_else(|| {
                output
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let y_columns = if y.is_empty() {
                DEFAULT_Y_COLUMNS.iter().map(|c| c.to_string()).collect()
            } else {
                y
            };

            let request = ChartRequest {
                csv,
                output,
                title,
                x_column: x,
                y_columns,
                kbps,
            };
            render_chart(&request)
                .with_context(|| format!("Rendering {} failed", request.output.display()))?;
            println!("Output svg: {}", request.output.display());
        }

        Commands::Batch {
            config,
            skip_simulation,
            traffic,
            kbps,
        } => {
            let mut settings = load_settings(config)?;
            if !traffic.is_empty() {
                settings.traffic = traffic;
            }
            if !kbps.is_empty() {
                settings.bandwidths_kbps = kbps;
            }

            let outcomes = run_batch(&settings, skip_simulation).context("Batch run failed")?;
            let mut failed = 0;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(summary) => println!(
                        "- [{}/{}kbps] {} records -> {}",
                        outcome.run.traffic,
                        outcome.run.kbps,
                        summary.records,
                        outcome.run.svg.display()
                    ),
                    Err(e) => {
                        failed += 1;
                        println!(
                            "- [{}/{}kbps] FAILED: {}",
                            outcome.run.traffic, outcome.run.kbps, e
                        );
                    }
                }
            }

            if failed > 0 {
                anyhow::bail!("{} of {} runs failed", failed, outcomes.len());
            }
        }

        Commands::Config { config } => {
            let settings = load_settings(config)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}
