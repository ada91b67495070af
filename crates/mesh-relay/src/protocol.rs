//! Identity types shared by the relay and the link layer.
//!
//! - [`OriginId`]: Stable identifier of the session that originated a message
//! - [`LinkId`]: Opaque address of one live point-to-point link

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::RelayError;

/// Field separator of the wire envelope.
pub const DELIMITER: &str = "|||";

/// Identifier of the device session that first created a message.
///
/// Assigned once per session and reused for every message the session sends.
/// Never empty and never contains [`DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OriginId(pub(crate) String);

impl OriginId {
    /// Creates an origin id, rejecting values that cannot be carried on the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or contains the field delimiter.
    pub fn new(id: impl Into<String>) -> Result<Self, RelayError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RelayError::InvalidField {
                field: "origin id",
                reason: "must not be empty".to_string(),
            });
        }
        check_no_delimiter("origin id", &id)?;
        Ok(Self(id))
    }

    /// Generates a random session identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OriginId {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OriginId> for String {
    fn from(id: OriginId) -> Self {
        id.0
    }
}

/// Address of a live point-to-point link, as assigned by the link layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(String);

impl LinkId {
    /// Creates a link id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LinkId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LinkId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Rejects a text field that would split into extra fields on the wire.
pub(crate) fn check_no_delimiter(field: &'static str, value: &str) -> Result<(), RelayError> {
    if value.contains(DELIMITER) {
        return Err(RelayError::InvalidField {
            field,
            reason: format!("must not contain {DELIMITER:?}"),
        });
    }
    Ok(())
}
