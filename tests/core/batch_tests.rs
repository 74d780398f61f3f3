//! Tests for experiment grid planning and batch runs
//!
//! Simulations are not launched here; runs use `skip_simulation` with
//! pre-written logs, or a simulator program that does not exist.

#[path = "../common/mod.rs"]
mod common;

use ccfslog::batch::{plan, run_batch, simulator_command, BatchError};
use ccfslog::settings::{BatchSettings, SimulatorSettings, TrafficMix};
use common::synthetic;

fn settings_in(dir: &std::path::Path) -> BatchSettings {
    BatchSettings {
        results_dir: dir.join("results"),
        traffic: vec![TrafficMix::Pure, TrafficMix::Udp],
        bandwidths_kbps: vec![300, 2000],
        ..BatchSettings::default()
    }
}

// ============================================
// Planning Tests
// ============================================

#[test]
fn test_plan_is_traffic_major() {
    let dir = tempfile::tempdir().unwrap();
    let names: Vec<String> = plan(&settings_in(dir.path()))
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["pure_300", "pure_2000", "udp_300", "udp_2000"]);
}

#[test]
fn test_plan_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runs = plan(&settings);
    let run = &runs[3];

    assert_eq!(run.log, settings.results_dir.join("udp_2000.out"));
    assert_eq!(run.csv, settings.results_dir.join("udp_2000.csv"));
    assert_eq!(run.svg, settings.results_dir.join("udp_2000.svg"));
    assert_eq!(run.title(), "udp_2000kbps");
}

#[test]
fn test_plan_empty_grid() {
    let settings = BatchSettings {
        bandwidths_kbps: Vec::new(),
        ..BatchSettings::default()
    };
    assert!(plan(&settings).is_empty());
}

#[test]
fn test_simulator_command_uses_settings() {
    let settings = BatchSettings {
        simulator: SimulatorSettings {
            workdir: "/opt/ns3".into(),
            program: "./ns3".to_string(),
            scenario: "gcc-example".to_string(),
        },
        ..BatchSettings::default()
    };
    let runs = plan(&settings);
    let udp = runs.iter().find(|r| r.name == "udp_1000").unwrap();

    let command = simulator_command(&settings, udp);
    let args: Vec<_> = command.get_args().collect();
    assert_eq!(command.get_program(), "./ns3");
    assert_eq!(args, ["--run", "gcc-example --kbps=1000 --udp=1"]);
    assert_eq!(command.get_current_dir(), Some(std::path::Path::new("/opt/ns3")));
}

// ============================================
// Batch Run Tests
// ============================================

#[test]
fn test_run_batch_with_existing_logs() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    std::fs::create_dir_all(&settings.results_dir).unwrap();
    for (i, run) in plan(&settings).iter().enumerate() {
        std::fs::write(&run.log, synthetic::log(i + 1)).unwrap();
    }

    let outcomes = run_batch(&settings, true).unwrap();
    assert_eq!(outcomes.len(), 4);

    let records: Vec<usize> = outcomes
        .iter()
        .map(|o| o.result.as_ref().unwrap().records)
        .collect();
    assert_eq!(records, vec![1, 2, 3, 4]);
    assert!(outcomes.iter().all(|o| o.run.svg.exists()));
}

#[test]
fn test_run_batch_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    std::fs::create_dir_all(&settings.results_dir).unwrap();

    let runs = plan(&settings);
    std::fs::write(&runs[0].log, synthetic::log(2)).unwrap();

    let outcomes = run_batch(&settings, true).unwrap();
    assert!(outcomes[0].result.is_ok());
    assert!(outcomes[1..].iter().all(|o| matches!(o.result, Err(BatchError::Extract(_)))));
}

#[test]
fn test_run_batch_missing_simulator() {
    let dir = tempfile::tempdir().unwrap();
    let settings = BatchSettings {
        simulator: SimulatorSettings {
            workdir: dir.path().to_path_buf(),
            program: "./definitely-not-a-simulator".to_string(),
            ..SimulatorSettings::default()
        },
        traffic: vec![TrafficMix::Tcp],
        bandwidths_kbps: vec![500],
        ..settings_in(dir.path())
    };

    let outcomes = run_batch(&settings, false).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0].result, Err(BatchError::Spawn { .. })));
}
