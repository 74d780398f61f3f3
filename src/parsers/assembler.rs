//! Burst record assembly
//!
//! The controller logs one feedback-processing burst as a run of loosely
//! related lines: a `[StartProcessFBM]` line, then any of the feedback,
//! bandwidth, queue and control lines, and finally a `[HndlTxEvt]` line. The
//! lines share no correlation id, so they are stitched together by position:
//! everything between a start line and the next transmit event belongs to
//! the same burst.

use strum::{EnumCount, IntoEnumIterator};

use super::patterns::{pattern, PACKET_DELAYS};
use super::types::{Extraction, FieldGroup, Group, LogLine, PacketDelay, ParseError};

/// Burst accumulator, one slot per column group
#[derive(Clone, Debug)]
pub struct PendingRecord {
    label: String,
    start_line: usize,
    groups: [Option<FieldGroup>; Group::COUNT],
}

impl PendingRecord {
    fn open(line: &LogLine<'_>, start: FieldGroup) -> Self {
        let label = timestamp_label(line.text).unwrap_or_else(|| {
            tracing::warn!("Burst start at line {} has no timestamp prefix", line.number);
            ""
        });

        let mut record = Self {
            label: label.to_string(),
            start_line: line.number,
            groups: Default::default(),
        };
        record.fill(start);
        record
    }

    /// Store a group in its fixed slot; a repeated group keeps the latest values
    fn fill(&mut self, fields: FieldGroup) {
        let slot = &mut self.groups[fields.group.index()];
        if slot.is_some() {
            tracing::debug!(
                "Burst from line {}: {} seen again, keeping latest values",
                self.start_line,
                fields.group
            );
        }
        *slot = Some(fields);
    }

    fn finish(self) -> OutputRecord {
        OutputRecord {
            label: self.label,
            start_line: self.start_line,
            groups: self.groups.into_iter().collect(),
        }
    }
}

/// A completed burst, flattened into fixed columns
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRecord {
    /// Timestamp text preceding the start tag (empty when absent)
    pub label: String,
    /// Line number of the `[StartProcessFBM]` line
    pub start_line: usize,
    /// One slot per [`Group`], in column order
    pub groups: Vec<Option<FieldGroup>>,
}

impl OutputRecord {
    pub fn group(&self, group: Group) -> Option<&FieldGroup> {
        self.groups.get(group.index()).and_then(Option::as_ref)
    }

    /// Label parsed as seconds
    pub fn timestamp(&self) -> Option<f64> {
        self.label.parse().ok()
    }

    /// CSV cells: label, then every group's values or blanks of the group's width
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.label.clone()];
        for group in Group::iter() {
            match self.group(group) {
                Some(fields) => cells.extend(fields.values.iter().map(ToString::to_string)),
                None => cells.extend(std::iter::repeat(String::new()).take(pattern(group).width())),
            }
        }
        cells
    }
}

/// Timestamp prefix: the text before the first `"s "` when it is numeric
fn timestamp_label(text: &str) -> Option<&str> {
    let prefix = text[..text.find("s ")?].trim();
    prefix
        .trim_start_matches('+')
        .parse::<f64>()
        .ok()
        .map(|_| prefix)
}

/// What one input line produced
#[derive(Debug, Default)]
pub struct Step {
    /// Set when the line closed a burst
    pub record: Option<OutputRecord>,
    /// Per-packet delays from an `[EstQDelay]` line inside a burst
    pub packet_delays: Vec<PacketDelay>,
}

/// Counters and diagnostics collected over one scan
#[derive(Clone, Debug, Default)]
pub struct AssemblySummary {
    pub lines: usize,
    pub records: usize,
    /// Bursts still open at end of input
    pub discarded_bursts: usize,
    pub diagnostics: Vec<ParseError>,
}

#[derive(Debug)]
enum State {
    Idle,
    Accumulating(PendingRecord),
}

/// Groups tried against each line of an open burst, in priority order.
/// The per-packet `[EstQDelay]` trigger sits between the queue update and the
/// control lines.
const BEFORE_PACKET_DELAYS: [Group; 3] =
    [Group::Feedback, Group::ForwardBandwidth, Group::InternalQueue];

/// Two-state machine turning log lines into burst records
#[derive(Debug)]
pub struct RecordAssembler {
    state: State,
    /// The previous line was `[EstQDelay]`; this one should be its summary
    awaiting_summary: bool,
    summary: AssemblySummary,
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            awaiting_summary: false,
            summary: AssemblySummary::default(),
        }
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, State::Accumulating(_))
    }

    /// Diagnostics reported so far
    pub fn diagnostics(&self) -> &[ParseError] {
        &self.summary.diagnostics
    }

    /// Consume the next line in file order
    pub fn feed(&mut self, line: LogLine<'_>) -> Step {
        self.summary.lines += 1;

        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {
                self.state = self.open(&line);
                Step::default()
            }
            State::Accumulating(pending) => self.accumulate(pending, &line),
        }
    }

    /// End of input. An open burst is dropped, not emitted.
    pub fn finish(mut self) -> AssemblySummary {
        if let State::Accumulating(pending) = self.state {
            tracing::debug!(
                "Discarding incomplete burst started at line {}",
                pending.start_line
            );
            self.summary.discarded_bursts += 1;
        }
        self.summary
    }

    fn open(&mut self, line: &LogLine<'_>) -> State {
        match pattern(Group::BurstStart).extract(line) {
            Extraction::Matched(fields) => State::Accumulating(PendingRecord::open(line, fields)),
            Extraction::Malformed(err) => {
                self.report(err);
                State::Idle
            }
            Extraction::NoMatch => State::Idle,
        }
    }

    fn accumulate(&mut self, mut pending: PendingRecord, line: &LogLine<'_>) -> Step {
        let mut step = Step::default();

        if std::mem::take(&mut self.awaiting_summary) {
            match pattern(Group::QueueDelay).extract(line) {
                Extraction::Matched(fields) => {
                    pending.fill(fields);
                    self.state = State::Accumulating(pending);
                    return step;
                }
                Extraction::Malformed(err) => {
                    self.report(err);
                    self.state = State::Accumulating(pending);
                    return step;
                }
                // Reported, then the line goes through every extractor below
                Extraction::NoMatch => self.report(ParseError::MissingCompanion {
                    line: line.number,
                    text: line.text.to_string(),
                }),
            }
        }

        if line.text.contains(pattern(Group::BurstStart).anchor()) {
            tracing::debug!(
                "Ignoring burst start at line {} inside burst from line {}",
                line.number,
                pending.start_line
            );
            self.state = State::Accumulating(pending);
            return step;
        }

        for group in BEFORE_PACKET_DELAYS {
            self.apply(&mut pending, group, line);
        }

        match PACKET_DELAYS.extract(line) {
            Extraction::Matched(delays) => {
                step.packet_delays = delays;
                self.awaiting_summary = true;
            }
            Extraction::Malformed(err) => self.report(err),
            Extraction::NoMatch => {}
        }

        self.apply(&mut pending, Group::ControlSend, line);

        match pattern(Group::TransmitEvent).extract(line) {
            Extraction::Matched(fields) => {
                pending.fill(fields);
                step.record = Some(pending.finish());
                self.summary.records += 1;
                self.awaiting_summary = false;
                return step;
            }
            Extraction::Malformed(err) => self.report(err),
            Extraction::NoMatch => {}
        }

        self.state = State::Accumulating(pending);
        step
    }

    fn apply(&mut self, pending: &mut PendingRecord, group: Group, line: &LogLine<'_>) {
        match pattern(group).extract(line) {
            Extraction::Matched(fields) => pending.fill(fields),
            Extraction::Malformed(err) => self.report(err),
            Extraction::NoMatch => {}
        }
    }

    fn report(&mut self, err: ParseError) {
        tracing::warn!("{}", err);
        self.summary.diagnostics.push(err);
    }
}

/// Assemble every completed burst of an in-memory log
pub fn assemble(text: &str) -> (Vec<OutputRecord>, AssemblySummary) {
    let mut assembler = RecordAssembler::new();
    let mut records = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if let Some(record) = assembler.feed(LogLine::new(i + 1, line)).record {
            records.push(record);
        }
    }

    (records, assembler.finish())
}
