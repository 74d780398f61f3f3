//! Batch experiment driver
//!
//! Runs the simulator once per (traffic mix, bandwidth) combination, then
//! extracts and charts every run. Simulations share the simulator's build
//! tree and run one at a time; extraction and rendering of the finished logs
//! run in parallel.

use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

use crate::chart::{render_chart, ChartError, ChartRequest};
use crate::export::{extract_with, ExtractError, ExtractOptions};
use crate::settings::{BatchSettings, TrafficMix};

/// Errors of a batch run. Only `CreateResultsDir` aborts the whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to create results directory {}: {source}", .path.display())]
    CreateResultsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create simulator log {}: {source}", .path.display())]
    CreateLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch simulator for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Simulator for {name} exited with {status}")]
    SimulatorFailed { name: String, status: ExitStatus },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// One cell of the experiment grid and its files
#[derive(Clone, Debug, PartialEq)]
pub struct BatchRun {
    pub traffic: TrafficMix,
    pub kbps: u32,
    pub name: String,
    pub log: PathBuf,
    pub csv: PathBuf,
    pub svg: PathBuf,
    pub packet_delays: Option<PathBuf>,
}

impl BatchRun {
    /// Chart title, e.g. `tcp_500kbps`
    pub fn title(&self) -> String {
        format!("{}kbps", self.name)
    }
}

/// Per-run result counts
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub records: usize,
    pub plotted_points: usize,
}

/// Outcome of one run
#[derive(Debug)]
pub struct RunOutcome {
    pub run: BatchRun,
    pub result: Result<RunSummary, BatchError>,
}

/// Expand the settings into runs, traffic-major as configured
pub fn plan(settings: &BatchSettings) -> Vec<BatchRun> {
    let dir = &settings.results_dir;
    settings
        .traffic
        .iter()
        .flat_map(|&traffic| {
            settings.bandwidths_kbps.iter().map(move |&kbps| {
                let name = format!("{}_{}", traffic, kbps);
                BatchRun {
                    traffic,
                    kbps,
                    log: dir.join(format!("{}.out", name)),
                    csv: dir.join(format!("{}.csv", name)),
                    svg: dir.join(format!("{}.svg", name)),
                    packet_delays: settings
                        .packet_delays
                        .then(|| dir.join(format!("pktqd_{}.csv", name))),
                    name,
                }
            })
        })
        .collect()
}

/// Simulator command for a run, without output redirection
pub fn simulator_command(settings: &BatchSettings, run: &BatchRun) -> Command {
    let mut scenario = format!("{} --kbps={}", settings.simulator.scenario, run.kbps);
    if let Some(flag) = run.traffic.simulator_flag() {
        scenario.push(' ');
        scenario.push_str(flag);
    }

    let mut command = Command::new(&settings.simulator.program);
    command
        .arg("--run")
        .arg(scenario)
        .current_dir(&settings.simulator.workdir);
    command
}

/// Run the simulator with stdout and stderr captured to the run's log
fn simulate(settings: &BatchSettings, run: &BatchRun) -> Result<(), BatchError> {
    let log_error = |source| BatchError::CreateLog {
        path: run.log.clone(),
        source,
    };
    let stdout = File::create(&run.log).map_err(log_error)?;
    let stderr = stdout.try_clone().map_err(log_error)?;

    tracing::info!("Running simulation {} ({}kbps, {})", run.name, run.kbps, run.traffic);
    let status = simulator_command(settings, run)
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|source| BatchError::Spawn {
            name: run.name.clone(),
            source,
        })?;

    if !status.success() {
        return Err(BatchError::SimulatorFailed {
            name: run.name.clone(),
            status,
        });
    }
    Ok(())
}

/// Extract and chart one finished run
pub fn process_run(settings: &BatchSettings, run: &BatchRun) -> Result<RunSummary, BatchError> {
    let options = ExtractOptions {
        packet_delays: run.packet_delays.clone(),
    };
    let report = extract_with(&run.log, &run.csv, &options)?;

    let request = ChartRequest {
        csv: run.csv.clone(),
        output: run.svg.clone(),
        title: run.title(),
        x_column: settings.chart.x_column.clone(),
        y_columns: settings.chart.y_columns.clone(),
        kbps: run.kbps,
    };
    let plotted_points = render_chart(&request)?;

    Ok(RunSummary {
        records: report.records,
        plotted_points,
    })
}

/// Run the whole grid.
///
/// With `skip_simulation`, existing logs in the results directory are reused.
pub fn run_batch(settings: &BatchSettings, skip_simulation: bool) -> Result<Vec<RunOutcome>, BatchError> {
    ensure_dir(&settings.results_dir)?;

    let simulated: Vec<(BatchRun, Result<(), BatchError>)> = plan(settings)
        .into_iter()
        .map(|run| {
            let result = if skip_simulation {
                Ok(())
            } else {
                simulate(settings, &run)
            };
            (run, result)
        })
        .collect();

    let outcomes: Vec<RunOutcome> = simulated
        .into_par_iter()
        .map(|(run, simulated)| {
            let result = simulated.and_then(|_| process_run(settings, &run));
            if let Err(e) = &result {
                tracing::warn!("Run {} failed: {}", run.name, e);
            }
            RunOutcome { run, result }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    tracing::info!(
        "Batch finished: {} runs, {} failed",
        outcomes.len(),
        failed
    );
    Ok(outcomes)
}

fn ensure_dir(path: &Path) -> Result<(), BatchError> {
    std::fs::create_dir_all(path).map_err(|source| BatchError::CreateResultsDir {
        path: path.to_path_buf(),
        source,
    })
}
