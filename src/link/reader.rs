//! Streaming reader loop: socket lines in, presentation jobs out

use crate::link::presenter::PresentationContext;
use crate::processing::emitter::{LineOutcome, TimedSampleEmitter};
use crate::processing::series::SampleSink;
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::sync::Arc;

/// Why a reader loop stopped
#[derive(Debug)]
pub enum StreamEnd {
    EndOfStream,
    Error(io::Error),
}

impl StreamEnd {
    pub fn is_error(&self) -> bool {
        matches!(self, StreamEnd::Error(_))
    }
}

/// Counters collected over the lifetime of one reader loop
#[derive(Debug)]
pub struct ReadReport {
    pub lines: u64,
    pub samples: u64,
    pub empty: u64,
    pub malformed: u64,
    pub end: StreamEnd,
}

/// Decodes a line stream and forwards samples to a sink through a
/// presentation context, without waiting for the sink.
pub struct StreamingReader {
    name: String,
    presenter: Arc<dyn PresentationContext>,
    sink: Arc<dyn SampleSink>,
}

impl StreamingReader {
    pub fn new(name: impl Into<String>, presenter: Arc<dyn PresentationContext>, sink: Arc<dyn SampleSink>) -> Self {
        Self {
            name: name.into(),
            presenter,
            sink,
        }
    }

    /// Read until end-of-stream or an I/O error
    pub fn run<R: BufRead>(&self, mut reader: R) -> ReadReport {
        let mut emitter = TimedSampleEmitter::new();
        let mut buf = Vec::with_capacity(128);
        let mut lines = 0u64;
        let mut samples = 0u64;

        let end = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break StreamEnd::EndOfStream,
                Ok(_) => {
                    lines += 1;
                    let line = String::from_utf8_lossy(&buf);
                    match emitter.accept(&line) {
                        LineOutcome::Sample(sample) => {
                            samples += 1;
                            let sink = Arc::clone(&self.sink);
                            self.presenter.post(Box::new(move || sink.update(sample)));
                        }
                        LineOutcome::Empty => {}
                        LineOutcome::Malformed(e) => {
                            debug!("{}: dropping line {:?}: {}", self.name, line.trim_end(), e);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break StreamEnd::Error(e),
            }
        };

        match &end {
            StreamEnd::EndOfStream => info!("{}: stream ended after {} samples", self.name, samples),
            StreamEnd::Error(e) => warn!("{}: stream failed after {} samples: {}", self.name, samples, e),
        }

        ReadReport {
            lines,
            samples,
            empty: emitter.empty(),
            malformed: emitter.malformed(),
            end,
        }
    }
}
