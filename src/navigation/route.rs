//! Routes and the run queue derived from them

use crate::core::{LazyTarget, Waypoint};
use crate::navigation::command::{GoToCommand, StateChange};
use crossbeam::channel::Sender;
use std::collections::VecDeque;

/// Fixed ordered list of waypoints plus a loop flag
#[derive(Debug, Clone)]
pub struct Route {
    targets: Vec<LazyTarget>,
    looping: bool,
}

impl Route {
    /// Route over fixed positions
    pub fn new(positions: &[Waypoint], looping: bool) -> Self {
        Self {
            targets: positions.iter().copied().map(LazyTarget::fixed).collect(),
            looping,
        }
    }

    /// Route whose positions are produced when each step is executed
    pub fn from_providers(targets: Vec<LazyTarget>, looping: bool) -> Self {
        Self { targets, looping }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Build one fresh command per waypoint, in route order
    pub fn build_commands(&self, actor_id: &str, events: &Sender<StateChange>) -> VecDeque<GoToCommand> {
        self.targets
            .iter()
            .enumerate()
            .map(|(i, target)| GoToCommand::with_listener(actor_id, i + 1, target.clone(), events.clone()))
            .collect()
    }
}

/// Mutable cursor over one pass of a route.
///
/// `resumption_index` counts the commands removed from the freshly built
/// queue, the current one included, so it equals the step of the current
/// command. Rebuilding and skipping `k - 1` brings step `k` back with the
/// same index.
#[derive(Debug, Default)]
pub struct RunQueue {
    pending: VecDeque<GoToCommand>,
    current: Option<GoToCommand>,
    resumption_index: usize,
}

impl RunQueue {
    pub fn fresh(route: &Route, actor_id: &str, events: &Sender<StateChange>) -> Self {
        Self {
            pending: route.build_commands(actor_id, events),
            current: None,
            resumption_index: 0,
        }
    }

    /// Drop the first `count` pending commands without dispatching them
    pub fn skip(&mut self, count: usize) {
        let count = count.min(self.pending.len());
        self.pending.drain(..count);
        self.resumption_index += count;
    }

    /// Take the next command and make it the current one
    pub fn pop_next(&mut self) -> Option<GoToCommand> {
        let next = self.pending.pop_front()?;
        self.resumption_index += 1;
        self.current = Some(next.clone());
        Some(next)
    }

    pub fn current(&self) -> Option<&GoToCommand> {
        self.current.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn resumption_index(&self) -> usize {
        self.resumption_index
    }
}
