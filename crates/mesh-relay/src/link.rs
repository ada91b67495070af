//! Link layer boundary.
//!
//! - [`LinkLayer`]: Outbound primitives the relay consumes from the transport
//! - [`LinkSet`]: The relay's view of currently connected links

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::error::RelayError;
use crate::protocol::{LinkId, OriginId};

/// Transport that owns the physical point-to-point links.
///
/// Discovery and connection establishment happen outside the relay; the
/// transport reports membership changes and inbound payloads through a
/// [`RelayHandle`](crate::node::RelayHandle) and exposes outbound
/// transmission here.
pub trait LinkLayer: Send + Sync + 'static {
    /// Returns this session's stable origin identifier.
    fn local_identity(&self) -> OriginId;

    /// Transmits a payload over one link.
    ///
    /// Success means the payload was handed to the link, not that the peer
    /// received it.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is gone or the write fails.
    fn transmit(&self, link: LinkId, payload: Arc<[u8]>) -> BoxFuture<'_, Result<(), RelayError>>;
}

/// Bookkeeping for one connected link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    connected_at: DateTime<Utc>,
    payloads_received: u64,
}

impl LinkEntry {
    fn new() -> Self {
        Self {
            connected_at: Utc::now(),
            payloads_received: 0,
        }
    }

    /// Returns when the link came up.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns how many payloads arrived over this link.
    #[must_use]
    pub const fn payloads_received(&self) -> u64 {
        self.payloads_received
    }
}

/// Set of currently connected links.
///
/// Iteration order is the link ids' sort order, which keeps fan-out
/// deterministic.
#[derive(Debug, Default)]
pub struct LinkSet {
    links: BTreeMap<LinkId, LinkEntry>,
}

impl LinkSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a link. Returns `false` if it was already present.
    pub fn insert(&mut self, link: LinkId) -> bool {
        if self.links.contains_key(&link) {
            return false;
        }
        self.links.insert(link, LinkEntry::new());
        true
    }

    /// Removes a link. Returns `false` if it was not present.
    pub fn remove(&mut self, link: &LinkId) -> bool {
        self.links.remove(link).is_some()
    }

    /// Returns true if the link is connected.
    #[must_use]
    pub fn contains(&self, link: &LinkId) -> bool {
        self.links.contains_key(link)
    }

    /// Returns the entry for a link.
    #[must_use]
    pub fn get(&self, link: &LinkId) -> Option<&LinkEntry> {
        self.links.get(link)
    }

    /// Counts a payload received over `link`, if it is connected.
    pub fn record_payload(&mut self, link: &LinkId) {
        if let Some(entry) = self.links.get_mut(link) {
            entry.payloads_received += 1;
        }
    }

    /// Returns the number of connected links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if no links are connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Returns every connected link id.
    #[must_use]
    pub fn ids(&self) -> Vec<LinkId> {
        self.links.keys().cloned().collect()
    }

    /// Returns every connected link id except `exclude`.
    #[must_use]
    pub fn ids_except(&self, exclude: &LinkId) -> Vec<LinkId> {
        self.links
            .keys()
            .filter(|id| *id != exclude)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str) -> LinkId {
        LinkId::from(id)
    }

    #[test]
    fn insert_and_remove() {
        let mut set = LinkSet::new();
        assert!(set.insert(link("b")));
        assert!(!set.insert(link("b")));
        assert_eq!(set.len(), 1);

        assert!(set.remove(&link("b")));
        assert!(!set.remove(&link("b")));
        assert!(set.is_empty());
    }

    #[test]
    fn ids_are_sorted() {
        let mut set = LinkSet::new();
        set.insert(link("c"));
        set.insert(link("a"));
        set.insert(link("b"));
        assert_eq!(set.ids(), vec![link("a"), link("b"), link("c")]);
    }

    #[test]
    fn ids_except_skips_arrival_link() {
        let mut set = LinkSet::new();
        for id in ["a", "b", "c"] {
            set.insert(link(id));
        }
        assert_eq!(set.ids_except(&link("b")), vec![link("a"), link("c")]);
        // Excluding an unknown link leaves the set intact.
        assert_eq!(set.ids_except(&link("z")).len(), 3);
    }

    #[test]
    fn record_payload_counts_known_links_only() {
        let mut set = LinkSet::new();
        set.insert(link("a"));
        set.record_payload(&link("a"));
        set.record_payload(&link("a"));
        set.record_payload(&link("ghost"));

        assert_eq!(set.get(&link("a")).map(LinkEntry::payloads_received), Some(2));
        assert!(set.get(&link("ghost")).is_none());
    }

    #[test]
    fn reconnect_resets_entry() {
        let mut set = LinkSet::new();
        set.insert(link("a"));
        set.record_payload(&link("a"));
        set.remove(&link("a"));
        set.insert(link("a"));
        assert_eq!(set.get(&link("a")).map(LinkEntry::payloads_received), Some(0));
    }
}
