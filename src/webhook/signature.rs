//! HMAC-SHA256 webhook signature verification.
//!
//! The platform signs the raw request body with the shared secret and sends
//! `sha256=<hex digest>` in the `ElevenLabs-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "ElevenLabs-Signature";

/// Prefix of the signature header value.
const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(mac)
}

/// Compute the header value a sender would attach to `body`.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let digest = mac_for(secret, body)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("{SIGNATURE_PREFIX}{digest}")
}

/// Check `signature_header` against the HMAC of `body` under `secret`.
///
/// Fails closed: a missing or empty secret or header, a missing `sha256=`
/// prefix, surrounding whitespace, non-hex digits or a digest of the wrong
/// length all return `false`.
/// The digest comparison itself runs in constant time.
#[must_use]
pub fn verify(secret: Option<&str>, body: &[u8], signature_header: Option<&str>) -> bool {
    let (Some(secret), Some(header)) = (secret, signature_header) else {
        return false;
    };
    if secret.is_empty() || header.is_empty() {
        return false;
    }

    let Some(hex_sig) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_sig) else {
        return false;
    };
    let Some(mac) = mac_for(secret, body) else {
        return false;
    };

    mac.verify_slice(&provided).is_ok()
}
