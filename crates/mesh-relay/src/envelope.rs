//! Wire envelope, codec, and message fingerprints.
//!
//! The wire form is four fields joined by [`DELIMITER`]:
//!
//! ```text
//! <origin_id>|||<origin_display_name>|||<hop_count>|||<content>
//! ```
//!
//! Decoding splits into at most four fields, so content carrying `|||` is
//! reconstructed verbatim.

use std::fmt;

use crate::error::{DecodeError, RelayError};
use crate::protocol::{check_no_delimiter, OriginId, DELIMITER};

/// The unit transmitted over a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    origin_id: OriginId,
    origin_display_name: String,
    hop_count: u32,
    content: Vec<u8>,
}

impl Envelope {
    /// Creates a freshly originated envelope at hop 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the display name contains the field delimiter.
    pub fn originate(
        origin_id: OriginId,
        origin_display_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<Self, RelayError> {
        let origin_display_name = origin_display_name.into();
        check_no_delimiter("display name", &origin_display_name)?;
        Ok(Self {
            origin_id,
            origin_display_name,
            hop_count: 0,
            content: content.into(),
        })
    }

    /// Returns the origin id.
    #[must_use]
    pub const fn origin_id(&self) -> &OriginId {
        &self.origin_id
    }

    /// Returns the origin's display name.
    #[must_use]
    pub fn origin_display_name(&self) -> &str {
        &self.origin_display_name
    }

    /// Returns the number of relay hops already traversed.
    #[must_use]
    pub const fn hop_count(&self) -> u32 {
        self.hop_count
    }

    /// Returns the opaque content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consumes the envelope, returning its content.
    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Returns the deduplication fingerprint of this envelope.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.origin_id, &self.content)
    }

    /// Returns a copy of this envelope one hop further along.
    #[must_use]
    pub fn next_hop(&self) -> Self {
        Self {
            hop_count: self.hop_count.saturating_add(1),
            ..self.clone()
        }
    }

    /// Returns this envelope with its hop count replaced.
    #[must_use]
    pub fn with_hop_count(mut self, hop_count: u32) -> Self {
        self.hop_count = hop_count;
        self
    }

    /// Encodes the envelope into its wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let hops = self.hop_count.to_string();
        let mut out = Vec::with_capacity(
            self.origin_id.as_str().len()
                + self.origin_display_name.len()
                + hops.len()
                + self.content.len()
                + 3 * DELIMITER.len(),
        );
        out.extend_from_slice(self.origin_id.as_str().as_bytes());
        out.extend_from_slice(DELIMITER.as_bytes());
        out.extend_from_slice(self.origin_display_name.as_bytes());
        out.extend_from_slice(DELIMITER.as_bytes());
        out.extend_from_slice(hops.as_bytes());
        out.extend_from_slice(DELIMITER.as_bytes());
        out.extend_from_slice(&self.content);
        out
    }

    /// Decodes an envelope from its wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than four fields are present, the hop count
    /// is not a non-negative decimal integer, a text field is not UTF-8, or
    /// the origin id is empty.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let fields = split_fields(bytes);
        let &[origin, name, hops, content] = fields.as_slice() else {
            return Err(DecodeError::MissingFields {
                found: fields.len(),
            });
        };

        let origin = std::str::from_utf8(origin)
            .map_err(|_| DecodeError::InvalidUtf8 { field: "origin id" })?;
        if origin.is_empty() {
            return Err(DecodeError::EmptyOrigin);
        }
        let name = std::str::from_utf8(name)
            .map_err(|_| DecodeError::InvalidUtf8 { field: "display name" })?;
        let hop_count = parse_hop_count(hops)?;

        Ok(Self {
            origin_id: OriginId(origin.to_string()),
            origin_display_name: name.to_string(),
            hop_count,
            content: content.to_vec(),
        })
    }
}

/// Splits a payload at the delimiter into at most four fields.
fn split_fields(bytes: &[u8]) -> Vec<&[u8]> {
    let delim = DELIMITER.as_bytes();
    let mut fields = Vec::with_capacity(4);
    let mut rest = bytes;
    while fields.len() < 3 {
        match rest.windows(delim.len()).position(|w| w == delim) {
            Some(at) => {
                fields.push(&rest[..at]);
                rest = &rest[at + delim.len()..];
            }
            None => break,
        }
    }
    fields.push(rest);
    fields
}

/// Parses an unsigned decimal hop count. Signs, whitespace and empty input are rejected.
fn parse_hop_count(field: &[u8]) -> Result<u32, DecodeError> {
    let invalid = || DecodeError::InvalidHopCount(String::from_utf8_lossy(field).into_owned());
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(invalid)
}

/// Deduplication key of a logical message.
///
/// Derived from the origin id and content only, so every copy of a message
/// carries the same fingerprint regardless of how many hops it has taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bytes: [u8; 16],
}

impl Fingerprint {
    /// Computes the fingerprint of `(origin_id, content)`.
    #[must_use]
    pub fn of(origin_id: &OriginId, content: &[u8]) -> Self {
        let origin = origin_id.as_str().as_bytes();
        let mut hasher = blake3::Hasher::new();
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update(&(origin.len() as u64).to_le_bytes());
        hasher.update(origin);
        hasher.update(content);

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
        Self { bytes }
    }

    /// Creates a fingerprint from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.bytes).into_string())
    }
}
