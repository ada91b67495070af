//! Controlled-flooding relay state machine.
//!
//! [`RelayEngine`] is synchronous and owns all mutable protocol state: the
//! seen-message cache and the connected-link set. It decides what to deliver
//! and where to transmit; callers perform the actual I/O. Every call takes an
//! explicit `now` so expiry is deterministic under test.
//!
//! Per-message lifecycle:
//!
//! ```text
//! Unseen -> Seen-and-Delivered -> [Forwarded] -> Expired
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::RelayConfig;
use crate::dedup::DedupCache;
use crate::envelope::{Envelope, Fingerprint};
use crate::error::{DecodeError, RelayError};
use crate::link::LinkSet;
use crate::protocol::{LinkId, OriginId};

/// A message surfaced to the application, at most once per logical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Session that created the message.
    pub origin_id: OriginId,
    /// Display name carried by the message.
    pub origin_display_name: String,
    /// Opaque content.
    pub content: Vec<u8>,
    /// Relay hops the message had taken when it arrived.
    pub hop_count: u32,
    /// When this node received it.
    pub arrival_time: DateTime<Utc>,
    /// Link it arrived on.
    pub arrival_link: LinkId,
}

impl ReceivedMessage {
    /// Returns the content as text, replacing invalid UTF-8.
    #[must_use]
    pub fn content_lossy(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Encoded payload and the links it must be transmitted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Fingerprint of the carried message.
    pub fingerprint: Fingerprint,
    /// Wire bytes, shared across every target.
    pub payload: Arc<[u8]>,
    /// Target links.
    pub targets: Vec<LinkId>,
}

/// What happens after a message is delivered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forwarding {
    /// The hop limit was reached; the message stops here.
    TtlExhausted,
    /// No connected link other than the arrival link.
    NoOtherLinks,
    /// Re-broadcast the next-hop envelope.
    To(Dispatch),
}

/// Why an inbound payload was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The payload was not a well-formed envelope.
    Malformed(DecodeError),
    /// The message was already seen within the retention window.
    Duplicate(Fingerprint),
}

/// Result of processing one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Nothing delivered, nothing forwarded.
    Dropped(DropReason),
    /// Delivered locally, then forwarded or stopped.
    Delivered {
        /// The message to surface.
        message: ReceivedMessage,
        /// Forwarding decision.
        forwarding: Forwarding,
    },
}

impl RelayOutcome {
    /// Returns the delivered message, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&ReceivedMessage> {
        match self {
            Self::Delivered { message, .. } => Some(message),
            Self::Dropped(_) => None,
        }
    }

    /// Returns the forward dispatch, if any.
    #[must_use]
    pub const fn forward(&self) -> Option<&Dispatch> {
        match self {
            Self::Delivered {
                forwarding: Forwarding::To(dispatch),
                ..
            } => Some(dispatch),
            _ => None,
        }
    }
}

/// Where a locally originated message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    /// Every connected link.
    Broadcast,
    /// One specific link.
    Link(LinkId),
}

impl From<Option<LinkId>> for SendTarget {
    fn from(target: Option<LinkId>) -> Self {
        target.map_or(Self::Broadcast, Self::Link)
    }
}

/// Outcome reported to the application for a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// Handed to the link layer.
    Dispatched,
    /// Broadcast attempted with no connected links.
    NoPeers,
    /// The targeted link is not connected or the transmit failed.
    TransmitFailed,
}

/// What the send path decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPlan {
    /// Transmit the payload to the listed links.
    Transmit(Dispatch),
    /// Nothing to transmit; report this outcome.
    Finished(SendOutcome),
}

/// Counters describing relay activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Messages surfaced to the application.
    pub delivered: u64,
    /// Inbound copies dropped as already seen.
    pub duplicates_dropped: u64,
    /// Inbound payloads dropped as malformed.
    pub malformed_dropped: u64,
    /// Messages re-broadcast to at least one link.
    pub forwarded: u64,
    /// Messages delivered at the hop limit and not forwarded.
    pub ttl_exhausted: u64,
    /// Messages originated locally and handed to the link layer.
    pub originated: u64,
    /// Per-link transmissions that failed.
    pub transmit_failures: u64,
    /// Fingerprints currently held in the seen cache.
    pub seen_fingerprints: usize,
}

/// The relay protocol core.
#[derive(Debug)]
pub struct RelayEngine {
    local_origin: OriginId,
    config: RelayConfig,
    cache: DedupCache,
    links: LinkSet,
    stats: RelayStats,
}

impl RelayEngine {
    /// Creates an engine for the given session identity.
    #[must_use]
    pub fn new(local_origin: OriginId, config: RelayConfig) -> Self {
        let cache = DedupCache::new(config.retention_window(), config.max_seen_cache);
        Self {
            local_origin,
            config,
            cache,
            links: LinkSet::new(),
            stats: RelayStats::default(),
        }
    }

    /// Returns this session's origin id.
    #[must_use]
    pub const fn local_origin(&self) -> &OriginId {
        &self.local_origin
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Returns the connected-link set.
    #[must_use]
    pub const fn links(&self) -> &LinkSet {
        &self.links
    }

    /// Returns the seen-message cache.
    #[must_use]
    pub const fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Returns a snapshot of the activity counters and the seen-cache size.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            seen_fingerprints: self.cache.len(),
            ..self.stats.clone()
        }
    }

    /// Records a link-up event.
    pub fn link_up(&mut self, link: LinkId) -> bool {
        let added = self.links.insert(link.clone());
        if added {
            debug!(link = %link, links = self.links.len(), "link up");
        }
        added
    }

    /// Records a link-down event.
    pub fn link_down(&mut self, link: &LinkId) -> bool {
        let removed = self.links.remove(link);
        if removed {
            debug!(link = %link, links = self.links.len(), "link down");
        }
        removed
    }

    /// Counts a failed per-link transmission.
    pub fn record_transmit_failure(&mut self) {
        self.stats.transmit_failures += 1;
    }

    /// Drops fingerprints older than the retention window.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        self.cache.evict_expired(now)
    }

    /// Processes one payload received on `arrival`.
    pub fn handle_payload(&mut self, payload: &[u8], arrival: &LinkId, now: Instant) -> RelayOutcome {
        self.cache.evict_expired(now);
        self.links.record_payload(arrival);

        let envelope = match self.decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(link = %arrival, error = %e, "dropping malformed envelope");
                self.stats.malformed_dropped += 1;
                return RelayOutcome::Dropped(DropReason::Malformed(e));
            }
        };

        let fingerprint = envelope.fingerprint();
        if self.cache.has_seen(&fingerprint) {
            trace!(link = %arrival, fingerprint = %fingerprint, "duplicate dropped");
            self.stats.duplicates_dropped += 1;
            return RelayOutcome::Dropped(DropReason::Duplicate(fingerprint));
        }
        self.cache.mark_seen(fingerprint, now);

        let hop_count = envelope.hop_count();
        let forwarding = self.plan_forward(&envelope, fingerprint, arrival);
        let forward_to = match &forwarding {
            Forwarding::To(dispatch) => dispatch.targets.len(),
            Forwarding::TtlExhausted | Forwarding::NoOtherLinks => 0,
        };
        debug!(
            link = %arrival,
            origin = %envelope.origin_id(),
            fingerprint = %fingerprint,
            hop_count,
            forward_to,
            "message delivered"
        );

        self.stats.delivered += 1;
        let message = ReceivedMessage {
            origin_id: envelope.origin_id().clone(),
            origin_display_name: envelope.origin_display_name().to_string(),
            hop_count,
            arrival_time: Utc::now(),
            arrival_link: arrival.clone(),
            content: envelope.into_content(),
        };

        RelayOutcome::Delivered {
            message,
            forwarding,
        }
    }

    /// Originates a message from this session.
    ///
    /// The fingerprint is marked seen before anything is transmitted so that
    /// an echo arriving over another path is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the display name cannot be carried on the wire.
    pub fn prepare_send(
        &mut self,
        content: Vec<u8>,
        display_name: &str,
        target: SendTarget,
        now: Instant,
    ) -> Result<SendPlan, RelayError> {
        self.cache.evict_expired(now);

        let envelope = Envelope::originate(self.local_origin.clone(), display_name, content)?;
        let fingerprint = envelope.fingerprint();
        self.cache.mark_seen(fingerprint, now);

        let targets = match target {
            SendTarget::Broadcast => {
                let targets = self.links.ids();
                if targets.is_empty() {
                    debug!(fingerprint = %fingerprint, "broadcast with no connected links");
                    return Ok(SendPlan::Finished(SendOutcome::NoPeers));
                }
                targets
            }
            SendTarget::Link(link) => {
                if !self.links.contains(&link) {
                    debug!(link = %link, fingerprint = %fingerprint, "send to unconnected link");
                    return Ok(SendPlan::Finished(SendOutcome::TransmitFailed));
                }
                vec![link]
            }
        };

        self.stats.originated += 1;
        debug!(fingerprint = %fingerprint, targets = targets.len(), "message originated");
        Ok(SendPlan::Transmit(Dispatch {
            fingerprint,
            payload: envelope.encode().into(),
            targets,
        }))
    }

    fn decode(&self, payload: &[u8]) -> Result<Envelope, DecodeError> {
        if payload.len() > self.config.max_payload_bytes {
            return Err(DecodeError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_bytes,
            });
        }
        Envelope::decode(payload)
    }

    fn plan_forward(
        &mut self,
        envelope: &Envelope,
        fingerprint: Fingerprint,
        arrival: &LinkId,
    ) -> Forwarding {
        if envelope.hop_count() >= self.config.max_hops {
            self.stats.ttl_exhausted += 1;
            return Forwarding::TtlExhausted;
        }

        let targets = self.links.ids_except(arrival);
        if targets.is_empty() {
            return Forwarding::NoOtherLinks;
        }

        self.stats.forwarded += 1;
        Forwarding::To(Dispatch {
            fingerprint,
            payload: envelope.next_hop().encode().into(),
            targets,
        })
    }
}
