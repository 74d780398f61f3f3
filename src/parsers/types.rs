use std::fmt;
use strum::{AsRefStr, Display, EnumCount, EnumIter};
use thiserror::Error;

/// Column groups of a burst record.
///
/// Declaration order is column order: iterating the enum yields the groups
/// exactly as they appear in the CSV header.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumCount, EnumIter, Eq, Hash, PartialEq)]
pub enum Group {
    /// `[StartProcessFBM]`, opens a burst
    BurstStart,
    /// `[ParseFBM]`
    Feedback,
    /// `[EstFwdBw]`
    ForwardBandwidth,
    /// `[UpdateIVQ]`
    InternalQueue,
    /// Untagged summary line following `[EstQDelay]`
    QueueDelay,
    /// `[CtrlSend]`
    ControlSend,
    /// `[HndlTxEvt]`, closes a burst
    TransmitEvent,
}

impl Group {
    /// Position of this group's slot inside a pending record
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Type of a single field slot in a tag template
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotKind {
    Int,
    Float,
    Token,
}

impl SlotKind {
    /// Regex fragment matching one value of this kind
    pub(crate) fn pattern(self) -> &'static str {
        match self {
            SlotKind::Int => r"[+-]?\d+",
            SlotKind::Float => {
                r"[+-]?(?:(?i:nan|inf(?:inity)?)|\d+(?:\.\d*)?(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?)"
            }
            SlotKind::Token => r"\S+",
        }
    }

    /// Convert captured text into a typed value
    pub fn parse(self, raw: &str) -> Option<FieldValue> {
        match self {
            SlotKind::Int => raw.parse::<i64>().ok().map(FieldValue::Int),
            SlotKind::Float => raw.parse::<f64>().ok().map(FieldValue::Float),
            SlotKind::Token if raw.is_empty() => None,
            SlotKind::Token => Some(FieldValue::Token(raw.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SlotKind::Int => "integer",
            SlotKind::Float => "float",
            SlotKind::Token => "token",
        }
    }
}

/// A parsed field value
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Token(String),
}

impl FieldValue {
    /// Numeric view of the value, used for charting
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Token(t) => t.parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Token(t) => f.write_str(t),
        }
    }
}

/// Values produced by one successful pattern match
#[derive(Clone, Debug, PartialEq)]
pub struct FieldGroup {
    pub group: Group,
    pub values: Vec<FieldValue>,
}

/// One line of input together with its 1-based line number
#[derive(Clone, Copy, Debug)]
pub struct LogLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

impl<'a> LogLine<'a> {
    pub fn new(number: usize, text: &'a str) -> Self {
        Self { number, text }
    }
}

/// One `<seq>:<value>ms` repetition of an `[EstQDelay]` line
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PacketDelay {
    pub seq: u64,
    pub delay_ms: i64,
}

/// Outcome of running one extractor over one line.
///
/// `NoMatch` is the frequent, expected case and is not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum Extraction<T = FieldGroup> {
    NoMatch,
    Matched(T),
    Malformed(ParseError),
}

/// Per-line extraction failures. These are reported and never abort a scan.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    /// The anchor is present but the line does not follow the template
    #[error("line {line}: {anchor} line does not match its template: {text}")]
    Malformed {
        line: usize,
        anchor: &'static str,
        text: String,
    },

    /// The template matched but a slot value is out of range
    #[error("line {line}: {anchor} field {raw:?} is not a valid {kind}")]
    InvalidValue {
        line: usize,
        anchor: &'static str,
        raw: String,
        kind: &'static str,
    },

    /// An `[EstQDelay]` line was not followed by its summary line
    #[error("line {line}: expected queue-delay summary after [EstQDelay], found: {text}")]
    MissingCompanion { line: usize, text: String },
}

impl ParseError {
    /// Line number the diagnostic refers to
    pub fn line(&self) -> usize {
        match self {
            ParseError::Malformed { line, .. }
            | ParseError::InvalidValue { line, .. }
            | ParseError::MissingCompanion { line, .. } => *line,
        }
    }
}
