//! CSV output and the file-level extraction entry points.
//!
//! The primary output has one row per completed burst. The secondary
//! per-packet `seq,xod` stream is only written when a path for it is given.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::parsers::{record_header, LogLine, OutputRecord, PacketDelay, ParseError, RecordAssembler};

/// Header of the per-packet delay stream
pub const PACKET_DELAY_HEADER: [&str; 2] = ["seq", "xod"];

// ============================================================================
// Error Types
// ============================================================================

/// Fatal errors of an extraction run
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Input log could not be opened
    #[error("Failed to open input log {}: {source}", .path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Input log could not be read to the end
    #[error("Failed to read input log {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Output CSV could not be created or written
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ExtractError {
    fn write(path: &Path, source: impl Into<csv::Error>) -> Self {
        ExtractError::Write {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

// ============================================================================
// Writers
// ============================================================================

/// Writer for the primary burst CSV
pub struct RecordWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl RecordWriter {
    /// Create or truncate `path` and write the header
    pub fn create(path: &Path) -> Result<Self, ExtractError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| ExtractError::write(path, e))?;
        writer
            .write_record(record_header())
            .map_err(|e| ExtractError::write(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn write(&mut self, record: &OutputRecord) -> Result<(), ExtractError> {
        self.writer
            .write_record(record.cells())
            .map_err(|e| ExtractError::write(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close; returns the number of rows written
    pub fn finish(mut self) -> Result<usize, ExtractError> {
        self.writer
            .flush()
            .map_err(|e| ExtractError::write(&self.path, e))?;
        Ok(self.rows)
    }
}

/// Writer for the per-packet delay stream
pub struct PacketDelayWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl PacketDelayWriter {
    pub fn create(path: &Path) -> Result<Self, ExtractError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| ExtractError::write(path, e))?;
        writer
            .write_record(PACKET_DELAY_HEADER)
            .map_err(|e| ExtractError::write(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn write(&mut self, delays: &[PacketDelay]) -> Result<(), ExtractError> {
        for delay in delays {
            self.writer
                .write_record([delay.seq.to_string(), delay.delay_ms.to_string()])
                .map_err(|e| ExtractError::write(&self.path, e))?;
        }
        self.rows += delays.len();
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize, ExtractError> {
        self.writer
            .flush()
            .map_err(|e| ExtractError::write(&self.path, e))?;
        Ok(self.rows)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Optional outputs of an extraction run
#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    /// Also write the per-packet `seq,xod` stream here
    pub packet_delays: Option<PathBuf>,
}

/// Result of a completed extraction run
#[derive(Clone, Debug, Default)]
pub struct ExtractReport {
    pub lines: usize,
    pub records: usize,
    pub packet_delays: usize,
    pub discarded_bursts: usize,
    pub diagnostics: Vec<ParseError>,
}

/// Extract burst records from `input` into the CSV at `output`.
///
/// Returns the number of records written.
pub fn extract(input: &Path, output: &Path) -> Result<usize, ExtractError> {
    extract_with(input, output, &ExtractOptions::default()).map(|report| report.records)
}

/// Extract with optional secondary outputs and a full report
pub fn extract_with(
    input: &Path,
    output: &Path,
    options: &ExtractOptions,
) -> Result<ExtractReport, ExtractError> {
    // Open the input first so a missing log never leaves an output behind
    let file = File::open(input).map_err(|source| ExtractError::OpenInput {
        path: input.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let mut records = RecordWriter::create(output)?;
    let mut packets = options
        .packet_delays
        .as_deref()
        .map(PacketDelayWriter::create)
        .transpose()?;

    let mut assembler = RecordAssembler::new();
    let mut buf = Vec::new();
    let mut number = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| ExtractError::ReadInput {
                path: input.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        number += 1;

        let text = String::from_utf8_lossy(&buf);
        let text = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
        let step = assembler.feed(LogLine::new(number, text));

        if let Some(writer) = packets.as_mut() {
            if !step.packet_delays.is_empty() {
                writer.write(&step.packet_delays)?;
            }
        }
        if let Some(record) = step.record {
            records.write(&record)?;
        }
    }

    let summary = assembler.finish();
    let written = records.finish()?;
    let packet_delays = match packets {
        Some(writer) => writer.finish()?,
        None => 0,
    };

    tracing::info!(
        "Extracted {} records from {} ({} lines, {} diagnostics, {} incomplete bursts dropped)",
        written,
        input.display(),
        summary.lines,
        summary.diagnostics.len(),
        summary.discarded_bursts
    );

    Ok(ExtractReport {
        lines: summary.lines,
        records: written,
        packet_delays,
        discarded_bursts: summary.discarded_bursts,
        diagnostics: summary.diagnostics,
    })
}
