//! Cheap structural guard applied to raw payloads before decoding

use crate::{DiscoveryError, Result};

/// Smallest well-formed document, `{"k":0}`
pub const MIN_PAYLOAD_LEN: usize = 7;

/// Reject payloads that cannot be a JSON object or array.
///
/// The trimmed payload must be at least [`MIN_PAYLOAD_LEN`] bytes and start
/// with `{` or `[`.
pub fn verify_payload(bytes: &[u8]) -> Result<()> {
    let trimmed = bytes.trim_ascii();
    if trimmed.len() < MIN_PAYLOAD_LEN {
        return Err(DiscoveryError::MalformedPayload(format!(
            "size: {}",
            trimmed.len()
        )));
    }
    match trimmed[0] {
        b'{' | b'[' => Ok(()),
        other => Err(DiscoveryError::MalformedPayload(format!(
            "start-token: {:?}",
            other as char
        ))),
    }
}
