//! Time-windowed cache of message fingerprints.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::envelope::Fingerprint;

/// Default retention window for seen fingerprints.
pub const DEFAULT_RETENTION_WINDOW: Duration = Duration::from_secs(60);

/// Default maximum number of fingerprints held at once.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Remembers which messages were seen recently.
///
/// A record's timestamp is fixed at first insertion. Marking an already-present
/// fingerprint keeps the original timestamp, so a message resent within the
/// window stays suppressed until the window measured from its *first*
/// sighting elapses, after which it is accepted as new.
#[derive(Debug)]
pub struct DedupCache {
    retention: Duration,
    max_entries: usize,
    /// First-seen time per fingerprint.
    seen: HashMap<Fingerprint, Instant>,
    /// Insertion order; timestamps are non-decreasing front to back.
    order: VecDeque<Fingerprint>,
}

impl DedupCache {
    /// Creates a cache with the given retention window and capacity.
    #[must_use]
    pub fn new(retention: Duration, max_entries: usize) -> Self {
        Self {
            retention,
            max_entries: max_entries.max(1),
            seen: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Creates a cache with a 60 second window.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_RETENTION_WINDOW, DEFAULT_MAX_ENTRIES)
    }

    /// Returns the retention window.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        self.retention
    }

    /// Returns true if a record for `fingerprint` exists and has not been evicted.
    #[must_use]
    pub fn has_seen(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains_key(fingerprint)
    }

    /// Records `fingerprint` as seen at `now`.
    ///
    /// Returns `false` if it was already present, in which case its original
    /// timestamp is left untouched.
    ///
    /// The capacity is a soft limit. When it is reached, expired records are
    /// swept first; records still inside the window are never dropped, so the
    /// cache grows past the limit rather than forget a live fingerprint.
    pub fn mark_seen(&mut self, fingerprint: Fingerprint, now: Instant) -> bool {
        if self.seen.contains_key(&fingerprint) {
            return false;
        }

        if self.seen.len() >= self.max_entries {
            let removed = self.evict_expired(now);
            if removed > 0 {
                tracing::debug!(removed, "seen cache full, swept expired records");
            } else if self.seen.len() == self.max_entries {
                tracing::warn!(
                    max_entries = self.max_entries,
                    "seen cache over capacity with live records, growing past limit"
                );
            }
        }

        self.seen.insert(fingerprint, now);
        self.order.push_back(fingerprint);
        true
    }

    /// Removes every record older than the retention window.
    ///
    /// Returns the number of records removed.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(oldest) = self.order.front() {
            let expired = self
                .seen
                .get(oldest)
                .map_or(true, |first_seen| now.saturating_duration_since(*first_seen) > self.retention);
            if !expired {
                break;
            }
            if let Some(fp) = self.order.pop_front() {
                self.seen.remove(&fp);
                removed += 1;
            }
        }
        removed
    }

    /// Returns the number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
