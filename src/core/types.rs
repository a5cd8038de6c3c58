//! Core data types shared by the sequencer and the telemetry pipeline

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 3D waypoint position in scene coordinates (meters)
pub type Waypoint = Vector3<f32>;

/// Late-bound waypoint: the position is produced when the command runs,
/// not when the route is built.
#[derive(Clone)]
pub struct LazyTarget(Arc<dyn Fn() -> Waypoint + Send + Sync>);

impl LazyTarget {
    /// Wrap a provider closure
    pub fn new<F>(provider: F) -> Self
    where
        F: Fn() -> Waypoint + Send + Sync + 'static,
    {
        LazyTarget(Arc::new(provider))
    }

    /// Provider that always yields the same position
    pub fn fixed(position: Waypoint) -> Self {
        Self::new(move || position)
    }

    /// Resolve the target position
    pub fn resolve(&self) -> Waypoint {
        (self.0)()
    }
}

impl fmt::Debug for LazyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyTarget(..)")
    }
}

/// One decoded accelerometer sample, ready for a rendering sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Milliseconds since the previous decoded sample on the same channel
    pub interval_ms: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl TelemetrySample {
    pub fn new(interval_ms: u64, x: f32, y: f32, z: f32) -> Self {
        Self { interval_ms, x, y, z }
    }
}
