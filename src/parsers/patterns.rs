//! Declarative tag patterns for CCFS controller log lines
//!
//! Every recognised line format is described as a sequence of [`Segment`]s:
//! literal anchors, emitted typed slots and skipped typed slots. A pattern is
//! compiled once into a regex and matched with search semantics, so any
//! timestamp/method prefix in front of the tag and any trailing text after
//! the template are ignored.
//!
//! Example lines, one per pattern:
//!
//! ```text
//! 59.9006s CcfsController:printProcessFbmLog(): [StartProcessFBM] NetRemains:18pkt, 17045bytes QPkts=0 QBytes=0 QMs=0 FbmCount=59
//! 1.50146s CcfsController:parseFeedback(): [ParseFBM] RxedPkt=8 RxedBytes=6691 TxedBytes=6675 SentRxedBytes=5964 AddedBytes=0 Lost=1
//! 0.200936s CcfsController:estiFwdBw(): [EstFwdBw]Estd=0kbps-->0kbps Txed=0kbps Rxed=0kbps Topo=1000kbps Target=150kbps
//! 8.90133s CcfsController:updateInternalVQDelay(): [UpdateIVQ] ivqQptMs=0.419 ivqDelayMs=0.0 netQDelayMs=1 corr=0.927173 properBw:291kbps(191kbps)
//! 39.4015s CcfsController:estiQDelay(): [EstQDelay] 57048:283ms,57049:243ms,
//!                                                   wndMinQDelayMs=1 wndMinQRangeMs=7 latestQDelay=2 QDelaySampleCount=40 intQDelay=1 currXQDelay=1 MA(XQDelay)=149.44
//! 0.2014s CcfsController:getControlSend(): [CtrlSend] targetQDelay=50 qdFraction=1 brFraction=0 xqFraction=1.5 ctrl.evt=0 increasingMs=0
//! 59.3014s CcfsController:handleSendControlEvent(): [HndlTxEvt] status=1->1 evt=0 Target: 122kbps->122kbps
//! ```

use regex::Regex;
use std::sync::LazyLock;
use strum::IntoEnumIterator;

use super::types::{Extraction, FieldGroup, Group, LogLine, PacketDelay, ParseError, SlotKind};

/// Header of the leading label column
pub const LABEL_HEADER: &str = "time(s)";

/// One piece of a tag template
#[derive(Clone, Copy, Debug)]
pub enum Segment {
    /// Literal text that must appear verbatim
    Lit(&'static str),
    /// Typed slot emitted under the given column header
    Field(&'static str, SlotKind),
    /// Typed slot that must parse but is not emitted
    Skip(SlotKind),
}

use Segment::{Field, Lit, Skip};
use SlotKind::{Float, Int, Token};

const BURST_START: &[Segment] = &[
    Lit("[StartProcessFBM] NetRemains:"),
    Field("rem_pkt", Int),
    Lit("pkt, "),
    Field("rem_bytes", Int),
    Lit("bytes QPkts="),
    Field("q_pkt", Int),
    Lit(" QBytes="),
    Field("q_bytes", Int),
    Lit(" QMs="),
    Field("q_ms", Int),
];

const FEEDBACK: &[Segment] = &[
    Lit("[ParseFBM] RxedPkt="),
    Skip(Int),
    Lit(" RxedBytes="),
    Skip(Int),
    Lit(" TxedBytes="),
    Skip(Int),
    Lit(" SentRxedBytes="),
    Skip(Int),
    Lit(" AddedBytes="),
    Skip(Int),
    Lit(" Lost="),
    Field("lost", Int),
];

const FORWARD_BANDWIDTH: &[Segment] = &[
    Lit("[EstFwdBw]Estd="),
    Skip(Int),
    Lit("kbps-->"),
    Field("est-bw(kbps)", Int),
    Lit("kbps Txed="),
    Field("txed(kbps)", Int),
    Lit("kbps Rxed="),
    Field("rxed(kbps)", Int),
    Lit("kbps Topo="),
    Field("topo(kbps)", Int),
    Lit("kbps"),
];

const INTERNAL_QUEUE: &[Segment] = &[
    Lit("[UpdateIVQ] ivqQptMs="),
    Skip(Float),
    Lit(" ivqDelayMs="),
    Skip(Float),
    Lit(" netQDelayMs="),
    Skip(Float),
    Lit(" corr="),
    Field("corr", Float),
    Lit(" properBw:"),
    Field("vbw", Int),
    Lit("kbps("),
    Field("obw", Int),
    Lit("kbps)"),
];

const QUEUE_DELAY: &[Segment] = &[
    Lit("wndMinQDelayMs="),
    Field("wnd_qdelay", Int),
    Lit(" wndMinQRangeMs="),
    Field("wnd_mrange", Int),
    Lit(" latestQDelay="),
    Field("qdelay", Int),
    Lit(" QDelaySampleCount="),
    Field("qd_samples", Int),
    Lit(" intQDelay="),
    Field("vqdelay", Int),
    Lit(" currXQDelay="),
    Skip(Float),
    Lit(" MA(XQDelay)="),
    Field("ma(XQ)", Float),
];

const CONTROL_SEND: &[Segment] = &[
    Lit("[CtrlSend] targetQDelay="),
    Field("target", Int),
    Lit(" qdFraction="),
    Field("qdFract", Float),
    Lit(" brFraction="),
    Field("brFract", Float),
    Lit(" xqFraction="),
    Field("xqFract", Float),
    Lit(" ctrl.evt="),
    Skip(Int),
    Lit(" increasingMs="),
    Field("incr(ms)", Int),
];

const TRANSMIT_EVENT: &[Segment] = &[
    Lit("[HndlTxEvt] status="),
    Skip(Token),
    Lit("->"),
    Field("status", Token),
    Lit(" evt="),
    Field("evt", Int),
    Lit(" Target: "),
    Skip(Int),
    Lit("kbps->"),
    Field("target(kbps)", Int),
    Lit("kbps"),
];

/// Anchor and template for each column group
fn definition(group: Group) -> (&'static str, &'static [Segment]) {
    match group {
        Group::BurstStart => ("[StartProcessFBM]", BURST_START),
        Group::Feedback => ("[ParseFBM]", FEEDBACK),
        Group::ForwardBandwidth => ("[EstFwdBw]", FORWARD_BANDWIDTH),
        Group::InternalQueue => ("[UpdateIVQ]", INTERNAL_QUEUE),
        Group::QueueDelay => ("wndMinQDelayMs=", QUEUE_DELAY),
        Group::ControlSend => ("[CtrlSend]", CONTROL_SEND),
        Group::TransmitEvent => ("[HndlTxEvt]", TRANSMIT_EVENT),
    }
}

/// Compiled pattern table, indexed by [`Group::index`]
static PATTERNS: LazyLock<Vec<TagPattern>> = LazyLock::new(|| {
    Group::iter()
        .map(|group| {
            let (anchor, segments) = definition(group);
            TagPattern::new(group, anchor, segments)
        })
        .collect()
});

/// Extractor for the repeated per-packet `[EstQDelay]` line
pub static PACKET_DELAYS: LazyLock<PacketDelayPattern> = LazyLock::new(PacketDelayPattern::new);

/// Get the compiled pattern for a column group
pub fn pattern(group: Group) -> &'static TagPattern {
    &PATTERNS[group.index()]
}

/// Full CSV header: label column followed by every group's columns
pub fn record_header() -> Vec<&'static str> {
    std::iter::once(LABEL_HEADER)
        .chain(Group::iter().flat_map(|g| pattern(g).headers()))
        .collect()
}

/// A compiled tag template
#[derive(Debug)]
pub struct TagPattern {
    group: Group,
    anchor: &'static str,
    segments: &'static [Segment],
    regex: Regex,
}

impl TagPattern {
    pub fn new(group: Group, anchor: &'static str, segments: &'static [Segment]) -> Self {
        let source: String = segments
            .iter()
            .map(|segment| match segment {
                Lit(text) => regex::escape(text),
                Field(_, kind) | Skip(kind) => format!("({})", kind.pattern()),
            })
            .collect();
        let regex = Regex::new(&source).expect("Invalid tag pattern");

        Self {
            group,
            anchor,
            segments,
            regex,
        }
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn anchor(&self) -> &'static str {
        self.anchor
    }

    /// Column headers of the emitted slots, in order
    pub fn headers(&self) -> impl Iterator<Item = &'static str> {
        self.segments.iter().filter_map(|segment| match segment {
            Field(name, _) => Some(*name),
            _ => None,
        })
    }

    /// Number of emitted columns
    pub fn width(&self) -> usize {
        self.headers().count()
    }

    /// Match a line against this template.
    ///
    /// Lines without the anchor are rejected before the regex runs. A line that
    /// carries the anchor but does not fit the template, or whose slots fail to
    /// parse, yields `Malformed`; partial results are never returned.
    pub fn extract(&self, line: &LogLine<'_>) -> Extraction {
        if !line.text.contains(self.anchor) {
            return Extraction::NoMatch;
        }

        let Some(captures) = self.regex.captures(line.text) else {
            return Extraction::Malformed(ParseError::Malformed {
                line: line.number,
                anchor: self.anchor,
                text: line.text.to_string(),
            });
        };

        let slots = self.segments.iter().filter_map(|segment| match segment {
            Lit(_) => None,
            Field(_, kind) => Some((*kind, true)),
            Skip(kind) => Some((*kind, false)),
        });

        let mut values = Vec::with_capacity(self.width());
        for ((kind, emit), raw) in slots.zip(captures.iter().skip(1)) {
            let raw = raw.map(|m| m.as_str()).unwrap_or_default();
            match kind.parse(raw) {
                Some(value) if emit => values.push(value),
                Some(_) => {}
                None => {
                    return Extraction::Malformed(ParseError::InvalidValue {
                        line: line.number,
                        anchor: self.anchor,
                        raw: raw.to_string(),
                        kind: kind.name(),
                    })
                }
            }
        }

        Extraction::Matched(FieldGroup {
            group: self.group,
            values,
        })
    }
}

/// Extractor for `[EstQDelay] <seq>:<value>ms,<seq>:<value>ms,...`
#[derive(Debug)]
pub struct PacketDelayPattern {
    /// Whole text after the tag: one or more repetitions and nothing else
    body: Regex,
    regex: Regex,
}

impl PacketDelayPattern {
    pub const ANCHOR: &'static str = "[EstQDelay]";

    fn new() -> Self {
        Self {
            body: Regex::new(r"^\s*(?:\d+:[+-]?\d+ms(?:,|\s|$)\s*)+$")
                .expect("Invalid packet delay line pattern"),
            regex: Regex::new(r"(\d+):([+-]?\d+)ms").expect("Invalid packet delay pattern"),
        }
    }

    /// Extract every repetition after the tag, in line order
    pub fn extract(&self, line: &LogLine<'_>) -> Extraction<Vec<PacketDelay>> {
        let Some(pos) = line.text.find(Self::ANCHOR) else {
            return Extraction::NoMatch;
        };
        let rest = &line.text[pos + Self::ANCHOR.len()..];
        if !self.body.is_match(rest) {
            return Extraction::Malformed(ParseError::Malformed {
                line: line.number,
                anchor: Self::ANCHOR,
                text: line.text.to_string(),
            });
        }

        let mut delays = Vec::new();
        for captures in self.regex.captures_iter(rest) {
            let (Ok(seq), Ok(delay_ms)) = (captures[1].parse::<u64>(), captures[2].parse::<i64>())
            else {
                return Extraction::Malformed(ParseError::InvalidValue {
                    line: line.number,
                    anchor: Self::ANCHOR,
                    raw: captures[0].to_string(),
                    kind: "packet delay",
                });
            };
            delays.push(PacketDelay { seq, delay_ms });
        }

        Extraction::Matched(delays)
    }
}
