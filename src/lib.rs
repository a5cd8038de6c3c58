//! Patient Route Harness
//!
//! A resumable waypoint sequencer that walks a simulated patient around a
//! route, plus a telemetry pipeline that discovers remote accelerometer
//! services, connects to them and streams their samples into shifting
//! display series.

pub mod core;
pub mod navigation;
pub mod processing;
pub mod link;
pub mod utils;

// Re-export commonly used types
pub use core::{LazyTarget, TelemetrySample, Waypoint};
pub use navigation::{
    Actor, CommandState, GoToCommand, MockActor, Route, RouteCallback, ScriptedActor, SequencerState,
    WaypointSequencer,
};
pub use processing::{
    decode_line, encode_line, parse_line, LineOutcome, SampleSink, SensorEvent, ShiftingSeries, TimedSampleEmitter,
};
pub use link::{
    Channel, ChannelHandle, ChannelReport, ChannelSpec, ConnectionEstablisher, Discovery, LinkError, LinkResult,
    PresentationContext, PresentationQueue, RetryPolicy, ServiceDescriptor, ServiceTable, StreamEnd,
};
pub use utils::{ConfigError, HarnessConfig};
