//! Keyed store of per-segment search state.
//!
//! The only shared mutable structure of the pipeline. Every mutation goes
//! through [`SearchStateStore::upsert`], which updates the map and fans the
//! change out to subscribers while holding the lock, so each subscriber sees
//! changes in the order they were applied.

use crate::core::Service;
use crate::kernel::services::ports::search::{ChangeReason, SegmentSearchState, StateChange};
use crate::kernel::services::ports::{Segment, SegmentKey};
use rustc_hash::FxHashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Default)]
struct StoreInner {
    states: FxHashMap<SegmentKey, SegmentSearchState>,
    subscribers: Vec<UnboundedSender<StateChange>>,
    disposed: bool,
}

impl StoreInner {
    fn publish(&mut self, change: StateChange) {
        self.subscribers
            .retain(|tx| tx.send(change.clone()).is_ok());
    }
}

#[derive(Default)]
pub struct SearchStateStore {
    inner: Mutex<StoreInner>,
}

impl SearchStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Every write is a single insert, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Writes `state` under its key. Returns `false` when nothing changed:
    /// the store is disposed, or the stored value is already identical.
    pub fn upsert(&self, state: SegmentSearchState) -> bool {
        let mut inner = self.lock();
        if inner.disposed {
            return false;
        }

        let key = state.key();
        let reason = match inner.states.get(&key) {
            Some(existing) if *existing == state => return false,
            Some(_) => ChangeReason::Update,
            None => ChangeReason::Add,
        };

        inner.states.insert(key, state.clone());
        inner.publish(StateChange { reason, state });
        true
    }

    /// Registers `segment` as pending unless its key is already known.
    /// Existing entries are never reset or replaced.
    pub fn register(&self, segment: Segment) -> bool {
        let mut inner = self.lock();
        if inner.disposed || inner.states.contains_key(&segment.key()) {
            return false;
        }

        let state = SegmentSearchState::pending(segment);
        inner.states.insert(segment.key(), state.clone());
        inner.publish(StateChange {
            reason: ChangeReason::Add,
            state,
        });
        true
    }

    pub fn lookup(&self, key: SegmentKey) -> Option<SegmentSearchState> {
        self.lock().states.get(&key).cloned()
    }

    /// Copy of every state, ordered by key.
    pub fn all_states(&self) -> Vec<SegmentSearchState> {
        let mut states: Vec<_> = self.lock().states.values().cloned().collect();
        states.sort_unstable_by_key(|s| s.key());
        states
    }

    /// Pending heads, closest to the live edge first.
    pub fn pending_heads(&self) -> Vec<SegmentSearchState> {
        let mut pending: Vec<_> = self
            .lock()
            .states
            .values()
            .filter(|s| s.segment.is_head() && s.is_pending())
            .cloned()
            .collect();
        pending.sort_unstable_by(|a, b| b.segment.index.cmp(&a.segment.index));
        pending
    }

    pub fn total_matches(&self) -> usize {
        self.lock().states.values().map(|s| s.match_count()).sum()
    }

    pub fn len(&self) -> usize {
        self.lock().states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change stream starting after the current contents. Ends when the store
    /// is disposed.
    pub fn subscribe(&self) -> UnboundedReceiver<StateChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if !inner.disposed {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Turns every later write into a no-op and closes all change streams.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        inner.disposed = true;
        inner.subscribers.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl Service for SearchStateStore {
    fn name(&self) -> &'static str {
        "SearchStateStore"
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/store.rs"]
mod tests;
