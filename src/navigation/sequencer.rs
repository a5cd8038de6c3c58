//! Resumable waypoint sequencer
//!
//! Drives one actor through a route, one go-to command at a time. The
//! sequencer never blocks: it is driven by whatever context calls
//! [`WaypointSequencer::start`], [`WaypointSequencer::process_events`],
//! [`WaypointSequencer::interrupt`] and [`WaypointSequencer::resume`].
//!
//! Command state changes reach the sequencer through a single-consumer
//! queue, so an actor that finishes a command inside `run_command` does not
//! re-enter the sequencer.

use crate::navigation::actor::Actor;
use crate::navigation::command::{CommandState, GoToCommand, StateChange};
use crate::navigation::route::{Route, RunQueue};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Callback invoked once when the whole route succeeds or fails
pub type RouteCallback = Box<dyn Fn(SequencerState) + Send>;

/// Sequencer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    Idle,
    Running,
    Success,
    Interrupted,
    Failed,
}

impl SequencerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SequencerState::Success | SequencerState::Failed)
    }
}

pub struct WaypointSequencer<A: Actor> {
    actor_id: String,
    route: Route,
    actor: A,
    queue: RunQueue,
    state: SequencerState,
    started: bool,
    passes_completed: u32,
    listener: Option<RouteCallback>,
    events_tx: Sender<StateChange>,
    events_rx: Receiver<StateChange>,
}

impl<A: Actor> WaypointSequencer<A> {
    /// Create an idle sequencer for `actor`
    pub fn new(actor_id: impl Into<String>, route: Route, actor: A) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            actor_id: actor_id.into(),
            route,
            actor,
            queue: RunQueue::default(),
            state: SequencerState::Idle,
            started: false,
            passes_completed: 0,
            listener: None,
            events_tx,
            events_rx,
        }
    }

    /// Register the terminal-outcome listener, replacing any previous one
    pub fn set_listener(&mut self, listener: RouteCallback) {
        self.listener = Some(listener);
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    pub fn actor_mut(&mut self) -> &mut A {
        &mut self.actor
    }

    /// Last dispatched command, if any
    pub fn current(&self) -> Option<&GoToCommand> {
        self.queue.current()
    }

    /// Commands taken from the current pass's queue, the running one included.
    ///
    /// While step `k` runs this is `k`; after [`resume`](Self::resume)
    /// re-dispatches step `k` it is `k` again. A looping route restarts at
    /// `1` when the next pass dispatches its first step, and `0` means
    /// nothing has been dispatched yet.
    pub fn resumption_index(&self) -> usize {
        self.queue.resumption_index()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.pending_len()
    }

    /// Completed passes over the route (looping routes keep counting)
    pub fn passes_completed(&self) -> u32 {
        self.passes_completed
    }

    /// Build the run queue and dispatch the first waypoint.
    ///
    /// Only the first call has an effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.queue = RunQueue::fresh(&self.route, &self.actor_id, &self.events_tx);
        self.state = SequencerState::Running;
        info!(
            "{}: route started ({} waypoints, looping={})",
            self.actor_id,
            self.route.len(),
            self.route.is_looping()
        );
        self.dispatch_next();
    }

    /// Drain pending command state changes and react to each of them.
    ///
    /// Returns the number of notifications handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(change) = self.events_rx.try_recv() {
            handled += 1;
            let current = match self.queue.current() {
                Some(cmd) if cmd.id() == change.command => cmd.clone(),
                _ => {
                    debug!("{}: stale notification for command {}", self.actor_id, change.command);
                    continue;
                }
            };
            self.on_child_state_changed(&current);
        }
        handled
    }

    /// React to a state change of the current command.
    ///
    /// `Success` advances the route and `Failed` ends it. Notifications for
    /// any other command, or received while not running, are ignored.
    pub fn on_child_state_changed(&mut self, command: &GoToCommand) {
        if self.state != SequencerState::Running {
            debug!(
                "{}: ignoring {} of step {} while {:?}",
                self.actor_id,
                command.state(),
                command.step(),
                self.state
            );
            return;
        }
        match self.queue.current() {
            Some(current) if current.id() == command.id() => {}
            _ => return,
        }

        match command.state() {
            CommandState::Success => self.advance(),
            CommandState::Failed => {
                warn!("{}: step {} failed, abandoning route", self.actor_id, command.step());
                self.finish(SequencerState::Failed);
            }
            CommandState::Created | CommandState::Running | CommandState::Interrupted => {}
        }
    }

    /// Ask the actor to stop the current command.
    ///
    /// Queued state changes are handled first, so a step the actor already
    /// finished is not lost. The run queue is then left untouched so that
    /// [`resume`](Self::resume) can rewind to the interrupted waypoint.
    pub fn interrupt(&mut self) {
        self.process_events();
        if self.state == SequencerState::Idle || self.state.is_terminal() {
            return;
        }
        if let Some(current) = self.queue.current().cloned() {
            info!("{}: interrupting step {}", self.actor_id, current.step());
            self.actor.interrupt_command(&current);
        }
        self.state = SequencerState::Interrupted;
    }

    /// Restart the interrupted waypoint from its beginning.
    ///
    /// Effective only when the last dispatched command reports
    /// `Interrupted` once queued state changes are handled; returns whether
    /// a command was redispatched.
    pub fn resume(&mut self) -> bool {
        self.process_events();
        let interrupted = matches!(
            self.queue.current().map(|cmd| cmd.state()),
            Some(CommandState::Interrupted)
        );
        if !interrupted || self.state.is_terminal() {
            return false;
        }

        let rewind = self.queue.resumption_index().saturating_sub(1);
        self.queue = RunQueue::fresh(&self.route, &self.actor_id, &self.events_tx);
        self.queue.skip(rewind);
        self.state = SequencerState::Running;
        info!("{}: resuming at step {}", self.actor_id, rewind + 1);
        self.dispatch_next();
        true
    }

    fn advance(&mut self) {
        if self.queue.is_exhausted() {
            self.passes_completed += 1;
            if !self.route.is_looping() {
                self.finish(SequencerState::Success);
                return;
            }
            info!("{}: pass {} done, looping", self.actor_id, self.passes_completed);
            self.queue = RunQueue::fresh(&self.route, &self.actor_id, &self.events_tx);
        }
        self.dispatch_next();
    }

    fn dispatch_next(&mut self) {
        match self.queue.pop_next() {
            Some(cmd) => {
                debug!(
                    "{}: dispatching step {} to {:?}",
                    self.actor_id,
                    cmd.step(),
                    cmd.target()
                );
                self.actor.run_command(cmd);
            }
            // only reachable for an empty route
            None => self.finish(SequencerState::Success),
        }
    }

    fn finish(&mut self, outcome: SequencerState) {
        self.state = outcome;
        info!("{}: route finished with {:?}", self.actor_id, outcome);
        if let Some(listener) = &self.listener {
            listener(outcome);
        }
    }
}
