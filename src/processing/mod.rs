//! Telemetry line decoding, interval stamping and rendering sinks

pub mod parser;
pub mod emitter;
pub mod series;

pub use parser::{decode_line, encode_line, parse_line, ParseError, SensorEvent};
pub use emitter::{LineOutcome, TimedSampleEmitter};
pub use series::{SampleSink, SeriesPoint, ShiftingSeries};
