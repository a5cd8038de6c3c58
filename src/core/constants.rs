//! Timing and retry parameters of the reference harness

/// Interval between discovery lookups while a sensor service is not registered yet
pub const DISCOVERY_POLL_INTERVAL_MS: u64 = 1000;

/// Socket connect attempts before a channel is abandoned
pub const CONNECT_ATTEMPTS: u32 = 5;

/// Pause between failed connect attempts
pub const CONNECT_RETRY_DELAY_MS: u64 = 500;

/// Service group the accelerometer servers register under
pub const ACCELEROMETER_GROUP: &str = "accel";
