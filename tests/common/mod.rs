//! Common test utilities shared across all test modules
//!
//! This module provides helper functions for reading example logs,
//! building synthetic CCFS bursts, and checking extracted CSV output.

#![allow(dead_code)]

use std::path::Path;

/// Helper function to read a text file, panicking with a clear message if not found.
/// This ensures CI catches missing example files instead of silently skipping tests.
pub fn read_example_file(file_path: &str) -> String {
    std::fs::read_to_string(file_path)
        .unwrap_or_else(|e| panic!("Failed to read example file '{}': {}", file_path, e))
}

/// Check if an example file exists (useful for conditional tests)
pub fn example_file_exists(file_path: &str) -> bool {
    Path::new(file_path).exists()
}

/// Example simulation logs
pub mod example_files {
    /// Three complete bursts, one malformed `[ParseFBM]` line, one `[EstQDelay]`
    /// without its summary line and an unfinished trailing burst
    pub const CCFS_PURE_300: &str = "exampleLogs/ccfs/pure_300.out";
}

/// Test data generators for synthetic tests
pub mod synthetic {
    /// Start-of-burst line at `time` seconds
    pub fn start(time: &str, rem_pkt: u32) -> String {
        format!(
            "{}s CcfsController:printProcessFbmLog(): [StartProcessFBM] NetRemains:{}pkt, {}bytes QPkts=0 QBytes=0 QMs=0 FbmCount=1",
            time,
            rem_pkt,
            rem_pkt * 800
        )
    }

    /// Feedback line reporting `lost` lost packets
    pub fn feedback(time: &str, lost: u32) -> String {
        format!(
            "{}s CcfsController:parseFeedback(): [ParseFBM] RxedPkt=8 RxedBytes=6691 TxedBytes=6675 SentRxedBytes=5964 AddedBytes=0 Lost={}",
            time, lost
        )
    }

    /// Forward bandwidth line
    pub fn forward_bandwidth(time: &str, txed: u32, topo: u32) -> String {
        format!(
            "{}s CcfsController:estiFwdBw(): [EstFwdBw]Estd=0kbps-->{}kbps Txed={}kbps Rxed={}kbps Topo={}kbps Target=150kbps",
            time, topo, txed, txed, topo
        )
    }

    /// Per-packet delay line followed by its summary line
    pub fn queue_delay(time: &str, seq: u64, qdelay: i64) -> [String; 2] {
        [
            format!(
                "{}s CcfsController:estiQDelay(): [EstQDelay] {}:{}ms,{}:{}ms,",
                time,
                seq,
                qdelay,
                seq + 1,
                qdelay
            ),
            format!(
                "    wndMinQDelayMs=1 wndMinQRangeMs=7 latestQDelay={} QDelaySampleCount=40 intQDelay=1 currXQDelay=1 MA(XQDelay)=149.44",
                qdelay
            ),
        ]
    }

    /// Transmit event line closing a burst
    pub fn transmit_event(time: &str, target: u32) -> String {
        format!(
            "{}s CcfsController:handleSendControlEvent(): [HndlTxEvt] status=1->1 evt=0 Target: {}kbps->{}kbps",
            time, target, target
        )
    }

    /// A complete burst with feedback, bandwidth and queue delay lines
    pub fn burst(index: usize) -> Vec<String> {
        let time = format!("{:.1}", 0.2 + index as f64 * 0.1);
        let [delays, summary] = queue_delay(&time, index as u64 * 2, 10 + index as i64);
        vec![
            start(&time, index as u32),
            feedback(&time, 0),
            forward_bandwidth(&time, 100 + index as u32, 300),
            delays,
            summary,
            transmit_event(&time, 150),
        ]
    }

    /// A log of `count` complete bursts separated by unrelated lines
    pub fn log(count: usize) -> String {
        let mut lines = vec!["Waf: Entering directory `/build'".to_string()];
        for i in 0..count {
            lines.extend(burst(i));
            lines.push(format!("{}s Node0:Send(): packet {}", i, i));
        }
        lines.join("\n")
    }
}

/// Assertion helpers for extracted CSV output
pub mod assertions {
    /// Assert that every row has the same number of cells as the header
    pub fn assert_fixed_width(csv: &str) {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let width = reader.headers().expect("CSV should have a header").len();

        for (i, row) in reader.records().enumerate() {
            let row = row.expect("CSV row should decode");
            assert_eq!(
                row.len(),
                width,
                "Row {} should have {} cells, got {}",
                i,
                width,
                row.len()
            );
        }
    }

    /// Assert that a column parses as non-decreasing numbers
    pub fn assert_monotonic_column(csv: &str, column: &str) {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let index = reader
            .headers()
            .expect("CSV should have a header")
            .iter()
            .position(|h| h == column)
            .unwrap_or_else(|| panic!("Column '{}' should exist", column));

        let values: Vec<f64> = reader
            .records()
            .map(|row| row.expect("CSV row should decode")[index].parse().unwrap())
            .collect();
        for (i, window) in values.windows(2).enumerate() {
            assert!(
                window[1] >= window[0],
                "{} at row {} should be non-decreasing: {} >= {}",
                column,
                i,
                window[1],
                window[0]
            );
        }
    }
}
