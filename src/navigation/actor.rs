//! Actor interface and a scripted walking actor
//!
//! The actor owns command execution. It must report exactly one terminal
//! state for every command it accepts and must answer an interrupt request
//! by moving the command to `Interrupted`.

use crate::core::Waypoint;
use crate::navigation::command::{CommandState, GoToCommand};
use log::{debug, info};

/// Executes go-to commands on behalf of a sequencer
pub trait Actor {
    /// Accept a command for execution
    fn run_command(&mut self, command: GoToCommand);

    /// Ask the actor to stop executing `command`
    fn interrupt_command(&mut self, command: &GoToCommand);
}

/// Distance under which a target counts as reached (meters)
const ARRIVAL_TOLERANCE_M: f32 = 0.01;

/// Kinematic stand-in for a simulated body.
///
/// Walks in a straight line toward the current target at a constant speed,
/// one `tick` at a time. The target is resolved when the command is
/// accepted.
#[derive(Debug)]
pub struct ScriptedActor {
    id: String,
    position: Waypoint,
    speed_m_s: f32,
    active: Option<(GoToCommand, Waypoint)>,
    accepted: u32,
}

impl ScriptedActor {
    pub fn new(id: impl Into<String>, position: Waypoint, speed_m_s: f32) -> Self {
        Self {
            id: id.into(),
            position,
            speed_m_s,
            active: None,
            accepted: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Waypoint {
        self.position
    }

    /// Command currently being walked, if any
    pub fn active_command(&self) -> Option<&GoToCommand> {
        self.active.as_ref().map(|(cmd, _)| cmd)
    }

    /// Number of commands accepted so far
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// A higher-priority behaviour (a fall) takes over the body.
    ///
    /// The walk in progress ends as `Interrupted`.
    pub fn preempt(&mut self) -> Option<GoToCommand> {
        let (cmd, _) = self.active.take()?;
        info!("{}: walk to step {} preempted", self.id, cmd.step());
        cmd.set_state(CommandState::Interrupted);
        Some(cmd)
    }

    /// Advance the simulation by `dt_s` seconds
    pub fn tick(&mut self, dt_s: f32) {
        let Some((cmd, target)) = &self.active else {
            return;
        };

        let offset = target - self.position;
        let distance = offset.norm();
        let step = self.speed_m_s * dt_s;

        if distance <= step || distance <= ARRIVAL_TOLERANCE_M {
            self.position = *target;
            debug!("{}: reached step {} at {:?}", self.id, cmd.step(), self.position);
            if let Some((cmd, _)) = self.active.take() {
                cmd.set_state(CommandState::Success);
            }
        } else {
            self.position += offset * (step / distance);
        }
    }
}

impl Actor for ScriptedActor {
    fn run_command(&mut self, command: GoToCommand) {
        let target = command.target();
        debug!("{}: walking to step {} at {:?}", self.id, command.step(), target);
        command.set_state(CommandState::Running);
        self.accepted += 1;
        if let Some((previous, _)) = self.active.replace((command, target)) {
            previous.set_state(CommandState::Interrupted);
        }
    }

    fn interrupt_command(&mut self, command: &GoToCommand) {
        let is_active = self
            .active
            .as_ref()
            .map(|(cmd, _)| cmd.id() == command.id())
            .unwrap_or(false);
        if is_active {
            self.active = None;
        }
        command.set_state(CommandState::Interrupted);
    }
}
