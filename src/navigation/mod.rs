//! Waypoint navigation: commands, routes, actors and the resumable sequencer

pub mod command;
pub mod route;
pub mod actor;
pub mod sequencer;
pub mod mock;

pub use command::{CommandId, CommandState, GoToCommand, StateChange};
pub use route::{Route, RunQueue};
pub use actor::{Actor, ScriptedActor};
pub use sequencer::{RouteCallback, SequencerState, WaypointSequencer};
pub use mock::MockActor;
