//! # Reconciliation History
//!
//! One entry per local tick while not under host authority: the tick, a
//! cloned snapshot of every action state, and the predicted kinematic
//! state. Retention is a policy, not an invariant - entries fall off on
//! acknowledgment or cap overflow, and a correction that misses its entry
//! is an accepted divergence, never an error.

use std::collections::VecDeque;

use skein_shared::{Tick, Vec3};

use crate::action::ActionState;

/// Locally predicted kinematic state at the end of a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PredictedState {
    /// Predicted position.
    pub position: Vec3,
    /// Predicted velocity.
    pub velocity: Vec3,
}

/// One tick's record: inputs as reduced, prediction as computed.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// The local tick this entry was recorded on.
    pub tick: Tick,
    /// Snapshot of every action state, indexed by action id.
    pub states: Box<[ActionState]>,
    /// Predicted state after simulating this tick.
    pub predicted: PredictedState,
}

/// Bounded record of local ticks for prediction correction.
pub struct InputHistory {
    pub(crate) entries: VecDeque<HistoryEntry>,
    cap: usize,
}

impl InputHistory {
    /// Creates a history retaining at most `cap` entries.
    ///
    /// # Panics
    ///
    /// Panics if `cap` is zero.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "history cap must be greater than zero");
        Self { entries: VecDeque::with_capacity(cap), cap }
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, dropping the oldest on cap overflow.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.cap {
            let dropped = self.entries.pop_front();
            tracing::debug!(
                tick = dropped.map_or(0, |e| e.tick),
                "history cap reached, oldest entry dropped"
            );
        }
        self.entries.push_back(entry);
    }

    /// Drops every entry at or before `tick` (host acknowledged them).
    pub fn acknowledge(&mut self, tick: Tick) {
        while self.entries.front().is_some_and(|entry| entry.tick <= tick) {
            self.entries.pop_front();
        }
    }

    /// Finds the entry recorded at `tick`.
    #[must_use]
    pub fn find(&self, tick: Tick) -> Option<&HistoryEntry> {
        self.index_of(tick).map(|index| &self.entries[index])
    }

    pub(crate) fn index_of(&self, tick: Tick) -> Option<usize> {
        self.entries.iter().position(|entry| entry.tick == tick)
    }

    /// The most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tick: Tick) -> HistoryEntry {
        HistoryEntry {
            tick,
            states: Box::new([]),
            predicted: PredictedState::default(),
        }
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut history = InputHistory::new(3);
        for tick in 1..=5 {
            history.push(entry(tick));
        }
        assert_eq!(history.len(), 3);
        assert!(history.find(2).is_none());
        assert!(history.find(3).is_some());
        assert_eq!(history.latest().unwrap().tick, 5);
    }

    #[test]
    fn test_acknowledge_prunes_prefix() {
        let mut history = InputHistory::new(8);
        for tick in 1..=6 {
            history.push(entry(tick));
        }
        history.acknowledge(4);
        assert_eq!(history.len(), 2);
        assert!(history.find(4).is_none());
        assert!(history.find(5).is_some());
    }

    #[test]
    fn test_find_miss_is_none() {
        let mut history = InputHistory::new(4);
        history.push(entry(10));
        assert!(history.find(9).is_none());
        assert!(history.find(11).is_none());
    }
}
