//! Tests for burst record assembly
//!
//! Tests cover:
//! - Start/transmit state transitions
//! - Fixed-width cells with blank groups
//! - The `[EstQDelay]` summary coupling
//! - Diagnostics for malformed lines
//! - Real example log assembly

#[path = "../common/mod.rs"]
mod common;

use ccfslog::parsers::{
    assemble, record_header, FieldValue, Group, LogLine, PacketDelay, ParseError, RecordAssembler,
};
use common::example_files::*;
use common::synthetic;
use common::{example_file_exists, read_example_file};

// ============================================
// Transition Tests
// ============================================

#[test]
fn test_empty_input() {
    let (records, summary) = assemble("");
    assert!(records.is_empty());
    assert_eq!(summary.lines, 0);
    assert_eq!(summary.discarded_bursts, 0);
}

#[test]
fn test_transmit_without_start_is_ignored() {
    let text = [synthetic::feedback("1", 0), synthetic::transmit_event("1", 100)].join("\n");
    let (records, summary) = assemble(&text);
    assert!(records.is_empty());
    assert!(summary.diagnostics.is_empty());
}

#[test]
fn test_each_burst_becomes_one_record() {
    let (records, summary) = assemble(&synthetic::log(5));

    assert_eq!(records.len(), 5);
    assert_eq!(summary.records, 5);
    assert_eq!(summary.discarded_bursts, 0);
    assert!(summary.diagnostics.is_empty());

    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["0.2", "0.3", "0.4", "0.5", "0.6"]);
}

#[test]
fn test_start_and_transmit_on_adjacent_lines() {
    let text = [synthetic::start("4.5", 3), synthetic::transmit_event("4.5", 90)].join("\n");
    let (records, _) = assemble(&text);

    assert_eq!(records.len(), 1);
    let cells = records[0].cells();
    assert_eq!(cells.len(), record_header().len());
    assert_eq!(cells[0], "4.5");
    assert_eq!(cells.last().map(String::as_str), Some("90"));
}

#[test]
fn test_unlabelled_start_gives_empty_label() {
    let text = [
        "CcfsController: [StartProcessFBM] NetRemains:1pkt, 800bytes QPkts=0 QBytes=0 QMs=0".to_string(),
        synthetic::transmit_event("1", 100),
    ]
    .join("\n");
    let (records, _) = assemble(&text);
    assert_eq!(records[0].label, "");
    assert_eq!(records[0].timestamp(), None);
}

#[test]
fn test_unfinished_burst_at_end_is_dropped() {
    let mut lines = synthetic::burst(0);
    lines.push(synthetic::start("9", 1));
    lines.push(synthetic::feedback("9", 2));

    let (records, summary) = assemble(&lines.join("\n"));
    assert_eq!(records.len(), 1);
    assert_eq!(summary.discarded_bursts, 1);
}

// ============================================
// Coupling Tests
// ============================================

#[test]
fn test_summary_line_fills_queue_delay() {
    let (records, _) = assemble(&synthetic::burst(3).join("\n"));
    let qd = records[0].group(Group::QueueDelay).expect("queue delay group");
    assert_eq!(qd.values[2], FieldValue::Int(13));
}

#[test]
fn test_summary_line_outside_coupling_is_not_used() {
    let [_, summary] = synthetic::queue_delay("1", 0, 5);
    let text = [
        synthetic::start("1", 1),
        summary,
        synthetic::transmit_event("1", 100),
    ]
    .join("\n");

    let (records, _) = assemble(&text);
    assert!(records[0].group(Group::QueueDelay).is_none());
}

#[test]
fn test_missing_summary_is_reported() {
    let [delays, _] = synthetic::queue_delay("1", 0, 5);
    let text = [
        synthetic::start("1", 1),
        delays,
        synthetic::transmit_event("1", 100),
    ]
    .join("\n");

    let (records, summary) = assemble(&text);
    assert_eq!(records.len(), 1, "The transmit line should still close the burst");
    assert!(records[0].group(Group::QueueDelay).is_none());
    assert!(matches!(
        summary.diagnostics.as_slice(),
        [ParseError::MissingCompanion { line: 3, .. }]
    ));
}

#[test]
fn test_packet_delays_only_inside_burst() {
    let [outside, _] = synthetic::queue_delay("0.1", 100, 9);
    let mut assembler = RecordAssembler::new();

    let step = assembler.feed(LogLine::new(1, &outside));
    assert!(step.packet_delays.is_empty());

    assembler.feed(LogLine::new(2, &synthetic::start("1", 1)));
    let [inside, _] = synthetic::queue_delay("1", 7, 3);
    let step = assembler.feed(LogLine::new(3, &inside));
    assert_eq!(
        step.packet_delays,
        vec![
            PacketDelay { seq: 7, delay_ms: 3 },
            PacketDelay { seq: 8, delay_ms: 3 }
        ]
    );
}

// ============================================
// Diagnostics Tests
// ============================================

#[test]
fn test_malformed_start_keeps_idle() {
    let text = [
        "1s X: [StartProcessFBM] NetRemains:lots".to_string(),
        synthetic::transmit_event("1", 100),
    ]
    .join("\n");

    let (records, summary) = assemble(&text);
    assert!(records.is_empty());
    assert_eq!(summary.diagnostics.len(), 1);
    assert_eq!(summary.diagnostics[0].line(), 1);
}

#[test]
fn test_diagnostics_do_not_stop_later_bursts() {
    let mut lines = vec![
        synthetic::start("1", 1),
        "1s X: [ParseFBM] RxedPkt=8".to_string(),
        synthetic::transmit_event("1", 100),
    ];
    lines.extend(synthetic::burst(1));

    let (records, summary) = assemble(&lines.join("\n"));
    assert_eq!(records.len(), 2);
    assert!(records[0].group(Group::Feedback).is_none());
    assert!(records[1].group(Group::Feedback).is_some());
    assert_eq!(summary.diagnostics.len(), 1);
}

// ============================================
// Real File Tests
// ============================================

#[test]
fn test_example_log_assembly() {
    if !example_file_exists(CCFS_PURE_300) {
        return;
    }

    let content = read_example_file(CCFS_PURE_300);
    let (records, summary) = assemble(&content);

    assert_eq!(records.len(), 3);
    assert_eq!(summary.lines, 29);
    assert_eq!(summary.discarded_bursts, 1);

    let lines: Vec<usize> = summary.diagnostics.iter().map(ParseError::line).collect();
    assert_eq!(lines, vec![15, 18]);
    assert!(matches!(summary.diagnostics[1], ParseError::MissingCompanion { .. }));

    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["0.200936", "1.50146", "2.70021"]);

    // Second burst: malformed feedback and no queue summary leave those groups blank
    let second = &records[1];
    assert!(second.group(Group::Feedback).is_none());
    assert!(second.group(Group::QueueDelay).is_none());
    assert_eq!(
        second.group(Group::ControlSend).map(|g| g.values[4].clone()),
        Some(FieldValue::Int(120))
    );
}
