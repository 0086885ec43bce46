//! Debounced batching of file-change events.
//!
//! File events are coalesced per path inside a quiescence window; one flush
//! then applies the whole batch. The clock is injectable so tests can
//! advance time and flush deterministically instead of racing real timers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

/// What happened to a path since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone)]
struct ChangeEntry {
    kind: ChangeKind,
    marked_at: Instant,
}

/// One drained batch, paths sorted for deterministic processing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .chain(self.deleted.iter())
    }
}

/// Accumulates change events and decides when a batch is ripe.
#[derive(Clone)]
pub struct ChangeTracker {
    changes: Arc<DashMap<PathBuf, ChangeEntry>>,
    debounce_window: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("pending", &self.changes.len())
            .field("debounce_window", &self.debounce_window)
            .finish()
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::with_clock(Duration::from_millis(100), Arc::new(SystemClock))
    }

    pub fn with_clock(debounce_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            changes: Arc::new(DashMap::new()),
            debounce_window,
            clock,
        }
    }

    /// Record an event, folding it into any pending entry for the path.
    /// An addition followed by a modification stays an addition.
    pub fn mark(&self, path: PathBuf, kind: ChangeKind) {
        let marked_at = self.clock.now();
        // Read the pending kind before inserting; holding the map guard
        // across the insert would self-deadlock on the shard.
        let pending = self.changes.get(&path).map(|e| e.kind);
        let kind = match (pending, kind) {
            (Some(ChangeKind::Added), ChangeKind::Modified) => ChangeKind::Added,
            _ => kind,
        };
        self.changes.insert(path, ChangeEntry { kind, marked_at });
    }

    /// True when there is a pending batch and the oldest entry has sat for
    /// at least the debounce window.
    pub fn should_flush(&self) -> bool {
        let Some(oldest) = self.changes.iter().map(|e| e.marked_at).min() else {
            return false;
        };
        self.clock.now().saturating_duration_since(oldest) >= self.debounce_window
    }

    /// Take the pending batch, leaving the tracker empty.
    pub fn drain(&self) -> ChangeBatch {
        let mut batch = ChangeBatch::default();
        let pending: Vec<(PathBuf, ChangeEntry)> = self
            .changes
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        self.changes.clear();
        for (path, entry) in pending {
            match entry.kind {
                ChangeKind::Added => batch.added.push(path),
                ChangeKind::Modified => batch.modified.push(path),
                ChangeKind::Deleted => batch.deleted.push(path),
            }
        }
        batch.added.sort_unstable();
        batch.modified.sort_unstable();
        batch.deleted.sort_unstable();
        batch
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> (ChangeTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (
            ChangeTracker::with_clock(Duration::from_millis(100), clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_flush_waits_for_quiescence() {
        let (tracker, clock) = tracker();
        assert!(!tracker.should_flush());

        tracker.mark(PathBuf::from("/p/a.exml"), ChangeKind::Modified);
        assert!(!tracker.should_flush());

        clock.advance(Duration::from_millis(100));
        assert!(tracker.should_flush());
    }

    #[test]
    fn test_new_event_folds_into_pending_batch() {
        let (tracker, clock) = tracker();
        tracker.mark(PathBuf::from("/p/a.exml"), ChangeKind::Modified);
        clock.advance(Duration::from_millis(60));
        tracker.mark(PathBuf::from("/p/b.exml"), ChangeKind::Added);
        // The oldest entry governs the window; the second event did not
        // reschedule it.
        clock.advance(Duration::from_millis(40));
        assert!(tracker.should_flush());
        let batch = tracker.drain();
        assert_eq!(batch.added, [PathBuf::from("/p/b.exml")]);
        assert_eq!(batch.modified, [PathBuf::from("/p/a.exml")]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_added_then_modified_stays_added() {
        let (tracker, _clock) = tracker();
        let path = PathBuf::from("/p/a.exml");
        tracker.mark(path.clone(), ChangeKind::Added);
        tracker.mark(path.clone(), ChangeKind::Modified);
        let batch = tracker.drain();
        assert_eq!(batch.added, [path]);
        assert!(batch.modified.is_empty());
    }

    #[test]
    fn test_delete_supersedes_earlier_kinds() {
        let (tracker, _clock) = tracker();
        let path = PathBuf::from("/p/a.exml");
        tracker.mark(path.clone(), ChangeKind::Modified);
        tracker.mark(path.clone(), ChangeKind::Deleted);
        let batch = tracker.drain();
        assert_eq!(batch.deleted, [path]);
        assert_eq!(batch.added.len() + batch.modified.len(), 0);
    }

    #[test]
    fn test_drain_resets_tracker() {
        let (tracker, clock) = tracker();
        tracker.mark(PathBuf::from("/p/a.exml"), ChangeKind::Added);
        let _ = tracker.drain();
        clock.advance(Duration::from_millis(500));
        assert!(!tracker.should_flush());
        assert!(tracker.drain().is_empty());
    }
}
