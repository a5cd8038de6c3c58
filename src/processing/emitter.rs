//! Timed sample emitter: decodes lines and stamps inter-arrival intervals

use crate::core::TelemetrySample;
use crate::processing::parser::{parse_line, ParseError};
use std::time::Instant;

/// Result of feeding one line to the emitter
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Decoded sample with its interval since the previous decoded sample
    Sample(TelemetrySample),
    /// Blank line, skipped
    Empty,
    /// Line did not decode; dropped
    Malformed(ParseError),
}

/// Per-channel interval bookkeeping.
///
/// Only decoded samples move the baseline, so a blank or malformed line
/// never shortens the interval reported for the next real sample.
#[derive(Debug)]
pub struct TimedSampleEmitter {
    last_read: Instant,
    decoded: u64,
    malformed: u64,
    empty: u64,
}

impl TimedSampleEmitter {
    /// Start measuring from now
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Start measuring from `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            last_read: start,
            decoded: 0,
            malformed: 0,
            empty: 0,
        }
    }

    pub fn accept(&mut self, line: &str) -> LineOutcome {
        self.accept_at(line, Instant::now())
    }

    /// Feed a line read at `now`
    pub fn accept_at(&mut self, line: &str, now: Instant) -> LineOutcome {
        match parse_line(line) {
            Ok(event) => {
                let interval_ms = now.saturating_duration_since(self.last_read).as_millis() as u64;
                self.last_read = now;
                self.decoded += 1;
                LineOutcome::Sample(TelemetrySample::new(interval_ms, event.x(), event.y(), event.z()))
            }
            Err(ParseError::Empty) => {
                self.empty += 1;
                LineOutcome::Empty
            }
            Err(e) => {
                self.malformed += 1;
                LineOutcome::Malformed(e)
            }
        }
    }

    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    pub fn empty(&self) -> u64 {
        self.empty
    }
}

impl Default for TimedSampleEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_interval_from_start() {
        let t0 = Instant::now();
        let mut emitter = TimedSampleEmitter::starting_at(t0);

        match emitter.accept_at("12.5,-3.0,0.2", t0 + Duration::from_millis(40)) {
            LineOutcome::Sample(sample) => {
                assert_eq!(sample.interval_ms, 40);
                assert!((sample.x - 12.5).abs() < 1e-6);
                assert!((sample.y + 3.0).abs() < 1e-6);
                assert!((sample.z - 0.2).abs() < 1e-6);
            }
            other => panic!("expected sample, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_line_does_not_move_baseline() {
        let t0 = Instant::now();
        let mut emitter = TimedSampleEmitter::starting_at(t0);
        emitter.accept_at("1,2,3", t0 + Duration::from_millis(10));

        assert_eq!(emitter.accept_at("", t0 + Duration::from_millis(25)), LineOutcome::Empty);

        match emitter.accept_at("4,5,6", t0 + Duration::from_millis(30)) {
            LineOutcome::Sample(sample) => assert_eq!(sample.interval_ms, 20),
            other => panic!("expected sample, got {:?}", other),
        }
        assert_eq!(emitter.empty(), 1);
        assert_eq!(emitter.decoded(), 2);
    }

    #[test]
    fn test_malformed_line_is_counted_and_skipped() {
        let t0 = Instant::now();
        let mut emitter = TimedSampleEmitter::starting_at(t0);

        assert!(matches!(
            emitter.accept_at("x,y", t0 + Duration::from_millis(5)),
            LineOutcome::Malformed(_)
        ));
        match emitter.accept_at("0,0,9.8", t0 + Duration::from_millis(15)) {
            LineOutcome::Sample(sample) => assert_eq!(sample.interval_ms, 15),
            other => panic!("expected sample, got {:?}", other),
        }
        assert_eq!(emitter.malformed(), 1);
    }
}
