//! Go-to sub-commands and their observable lifecycle

use crate::core::{LazyTarget, Waypoint};
use crossbeam::channel::Sender;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a dispatched command. Only the executing actor moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandState {
    Created,
    Running,
    Success,
    Interrupted,
    Failed,
}

impl CommandState {
    /// No further transitions are accepted from a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandState::Success | CommandState::Interrupted | CommandState::Failed)
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Process-unique command identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        CommandId(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State change notification delivered to the owning sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub command: CommandId,
    pub state: CommandState,
}

struct CommandInner {
    id: CommandId,
    actor_id: String,
    step: usize,
    target: LazyTarget,
    state: Mutex<CommandState>,
    listener: Option<Sender<StateChange>>,
}

/// Walk one actor to one waypoint.
///
/// Cloning yields another handle to the same command: the actor keeps one
/// to drive execution, the sequencer keeps one to observe the state.
#[derive(Clone)]
pub struct GoToCommand {
    inner: Arc<CommandInner>,
}

impl GoToCommand {
    /// Create a detached command that reports to nobody
    pub fn new(actor_id: impl Into<String>, step: usize, target: LazyTarget) -> Self {
        Self::build(actor_id.into(), step, target, None)
    }

    /// Create a command whose state changes are pushed into `listener`
    pub fn with_listener(
        actor_id: impl Into<String>,
        step: usize,
        target: LazyTarget,
        listener: Sender<StateChange>,
    ) -> Self {
        Self::build(actor_id.into(), step, target, Some(listener))
    }

    fn build(actor_id: String, step: usize, target: LazyTarget, listener: Option<Sender<StateChange>>) -> Self {
        Self {
            inner: Arc::new(CommandInner {
                id: CommandId::next(),
                actor_id,
                step,
                target,
                state: Mutex::new(CommandState::Created),
                listener,
            }),
        }
    }

    pub fn id(&self) -> CommandId {
        self.inner.id
    }

    pub fn actor_id(&self) -> &str {
        &self.inner.actor_id
    }

    /// 1-based position of the waypoint within its route
    pub fn step(&self) -> usize {
        self.inner.step
    }

    /// Resolve the (possibly late-bound) target position
    pub fn target(&self) -> Waypoint {
        self.inner.target.resolve()
    }

    pub fn state(&self) -> CommandState {
        match self.inner.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Move the command to `state` and notify the listener.
    ///
    /// Returns `false` when the command already reached a terminal state or
    /// is already in `state`; no notification is sent in that case.
    pub fn set_state(&self, state: CommandState) -> bool {
        {
            let mut guard = match self.inner.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if guard.is_terminal() || *guard == state {
                return false;
            }
            *guard = state;
        }

        debug!(
            "command {} ({} step {}) -> {}",
            self.inner.id, self.inner.actor_id, self.inner.step, state
        );

        if let Some(listener) = &self.inner.listener {
            // the sequencer may already be gone
            let _ = listener.send(StateChange {
                command: self.inner.id,
                state,
            });
        }
        true
    }
}

impl fmt::Debug for GoToCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoToCommand")
            .field("id", &self.inner.id)
            .field("actor_id", &self.inner.actor_id)
            .field("step", &self.inner.step)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for GoToCommand {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}
