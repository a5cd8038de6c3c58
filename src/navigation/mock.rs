//! Mock actor for testing sequencers without a simulated body

use crate::navigation::actor::Actor;
use crate::navigation::command::{CommandState, GoToCommand};

/// Records every dispatched command and lets the test decide its outcome
pub struct MockActor {
    dispatched: Vec<GoToCommand>,
    interrupt_requests: u32,
    honor_interrupts: bool,
}

impl MockActor {
    pub fn new() -> Self {
        Self {
            dispatched: Vec::new(),
            interrupt_requests: 0,
            honor_interrupts: true,
        }
    }

    /// When disabled, interrupt requests are counted but the command keeps running
    pub fn set_honor_interrupts(&mut self, honor: bool) {
        self.honor_interrupts = honor;
    }

    /// All commands received so far, in dispatch order
    pub fn dispatched(&self) -> &[GoToCommand] {
        &self.dispatched
    }

    pub fn last(&self) -> Option<&GoToCommand> {
        self.dispatched.last()
    }

    pub fn interrupt_requests(&self) -> u32 {
        self.interrupt_requests
    }

    /// Finish the most recent command successfully
    pub fn complete_last(&self) -> Option<GoToCommand> {
        self.finish_last(CommandState::Success)
    }

    /// Fail the most recent command
    pub fn fail_last(&self) -> Option<GoToCommand> {
        self.finish_last(CommandState::Failed)
    }

    /// Interrupt the most recent command on the actor's own initiative
    pub fn preempt_last(&self) -> Option<GoToCommand> {
        self.finish_last(CommandState::Interrupted)
    }

    fn finish_last(&self, state: CommandState) -> Option<GoToCommand> {
        let cmd = self.dispatched.last()?.clone();
        cmd.set_state(state);
        Some(cmd)
    }
}

impl Default for MockActor {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for MockActor {
    fn run_command(&mut self, command: GoToCommand) {
        command.set_state(CommandState::Running);
        self.dispatched.push(command);
    }

    fn interrupt_command(&mut self, command: &GoToCommand) {
        self.interrupt_requests += 1;
        if self.honor_interrupts {
            command.set_state(CommandState::Interrupted);
        }
    }
}
