//! Error types for mesh-relay.

use thiserror::Error;

use crate::protocol::LinkId;

/// Reasons a wire payload could not be decoded into an envelope.
///
/// Every variant is a malformed envelope: the payload is dropped and never
/// surfaced to the application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer than the four delimited fields were present.
    #[error("expected 4 fields, found {found}")]
    MissingFields {
        /// Number of fields actually extracted.
        found: usize,
    },

    /// The hop-count field is not a non-negative decimal integer.
    #[error("invalid hop count {0:?}")]
    InvalidHopCount(String),

    /// A text field is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The origin id field is empty.
    #[error("origin id is empty")]
    EmptyOrigin,

    /// The payload exceeds the configured size limit.
    #[error("payload of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        /// Size of the payload in bytes.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
}

/// Errors that can occur in relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// An inbound payload was not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] DecodeError),

    /// A field supplied by the local application cannot be carried on the wire.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the rejected field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The link is not in the connected set.
    #[error("link {0} is not connected")]
    LinkNotConnected(LinkId),

    /// The link layer could not deliver a payload.
    #[error("transmit to {link} failed: {reason}")]
    Transmit {
        /// Target link.
        link: LinkId,
        /// Failure description from the link layer.
        reason: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The relay node's worker task is no longer running.
    #[error("relay node stopped")]
    NodeStopped,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
