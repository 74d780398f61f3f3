pub mod assembler;
pub mod patterns;
pub mod types;

pub use assembler::{assemble, AssemblySummary, OutputRecord, RecordAssembler, Step};
pub use patterns::{pattern, record_header, TagPattern, PACKET_DELAYS};
pub use types::{Extraction, FieldGroup, FieldValue, Group, LogLine, PacketDelay, ParseError};
