//! ccfslog - telemetry extraction for CCFS congestion-control simulation logs
//!
//! The CCFS controller logs each feedback-processing burst as a handful of
//! tagged lines. This library stitches those lines back together into one
//! fixed-width CSV row per burst, and renders the result as an SVG chart.
//!
//! ## Module Structure
//!
//! - [`parsers`] - Tag patterns and the burst record assembler
//!   - `patterns` - Declarative per-tag field extractors
//!   - `assembler` - Idle/accumulating state machine producing records
//!   - `types` - Field groups, values and per-line diagnostics
//! - [`export`] - CSV writers and the `extract` entry points
//! - [`chart`] - SVG line charts from extracted CSVs
//! - [`batch`] - Simulation × extraction × chart over an experiment grid
//! - [`settings`] - Batch settings persistence

pub mod batch;
pub mod chart;
pub mod export;
pub mod parsers;
pub mod settings;

pub use export::{extract, extract_with, ExtractError, ExtractOptions, ExtractReport};
