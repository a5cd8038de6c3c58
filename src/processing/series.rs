//! Rendering sinks and the shifting accelerometer series

use crate::core::TelemetrySample;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Receives decoded samples on the presentation context.
///
/// Implementations serialize concurrent updates themselves.
pub trait SampleSink: Send + Sync {
    fn update(&self, sample: TelemetrySample);
}

/// One plotted point; `t_ms` is the sum of intervals since the first sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub t_ms: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Default)]
struct Window {
    points: VecDeque<SeriesPoint>,
    elapsed_ms: u64,
    received: u64,
}

/// Headless model of a shifting XY chart: keeps the most recent
/// `capacity` points and drops the oldest as new ones arrive.
#[derive(Debug)]
pub struct ShiftingSeries {
    title: String,
    unit: String,
    labels: [String; 3],
    capacity: usize,
    window: Mutex<Window>,
}

impl ShiftingSeries {
    pub fn new(title: impl Into<String>, capacity: usize) -> Self {
        Self {
            title: title.into(),
            unit: "m/s2".to_string(),
            labels: ["x".to_string(), "y".to_string(), "z".to_string()],
            capacity: capacity.max(1),
            window: Mutex::new(Window::default()),
        }
    }

    /// Set the value unit and a comma-separated list of the three axis labels
    pub fn with_axis(mut self, unit: impl Into<String>, labels: &str) -> Self {
        self.unit = unit.into();
        let mut parts = labels.split(',').map(str::trim);
        for label in self.labels.iter_mut() {
            if let Some(part) = parts.next() {
                *label = part.to_string();
            }
        }
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn labels(&self) -> &[String; 3] {
        &self.labels
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Points currently in the window, oldest first
    pub fn snapshot(&self) -> Vec<SeriesPoint> {
        self.with_window(|w| w.points.iter().copied().collect())
    }

    pub fn latest(&self) -> Option<SeriesPoint> {
        self.with_window(|w| w.points.back().copied())
    }

    pub fn len(&self) -> usize {
        self.with_window(|w| w.points.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total samples received, including those shifted out
    pub fn received(&self) -> u64 {
        self.with_window(|w| w.received)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.with_window(|w| w.elapsed_ms)
    }

    fn with_window<T>(&self, f: impl FnOnce(&mut Window) -> T) -> T {
        let mut guard = match self.window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl SampleSink for ShiftingSeries {
    fn update(&self, sample: TelemetrySample) {
        let capacity = self.capacity;
        self.with_window(|w| {
            w.elapsed_ms += sample.interval_ms;
            w.received += 1;
            if w.points.len() == capacity {
                w.points.pop_front();
            }
            w.points.push_back(SeriesPoint {
                t_ms: w.elapsed_ms,
                x: sample.x,
                y: sample.y,
                z: sample.z,
            });
        });
    }
}
