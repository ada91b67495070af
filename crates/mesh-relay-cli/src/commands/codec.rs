//! Wire payload inspection.

use anyhow::Context;
use mesh_relay::{Envelope, OriginId};

use crate::cli::EncodeArgs;
use crate::output::{DecodedPayload, EncodedPayload};

/// Decodes a payload given as text.
pub fn decode(payload: &str) -> anyhow::Result<DecodedPayload> {
    let envelope = Envelope::decode(payload.as_bytes()).context("malformed payload")?;
    Ok(DecodedPayload {
        origin_id: envelope.origin_id().to_string(),
        display_name: envelope.origin_display_name().to_string(),
        hop_count: envelope.hop_count(),
        fingerprint: envelope.fingerprint().to_string(),
        content: String::from_utf8_lossy(envelope.content()).into_owned(),
    })
}

/// Encodes a message into its wire form.
pub fn encode(args: &EncodeArgs) -> anyhow::Result<EncodedPayload> {
    let origin = OriginId::new(args.origin.as_str())?;
    let envelope = Envelope::originate(origin, args.name.as_str(), args.content.as_bytes())?
        .with_hop_count(args.hops);
    Ok(EncodedPayload {
        payload: String::from_utf8_lossy(&envelope.encode()).into_owned(),
        fingerprint: envelope.fingerprint().to_string(),
    })
}
