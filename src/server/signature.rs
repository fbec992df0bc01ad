//! HMAC-SHA256 signatures on submitted events.
//!
//! When a shared secret is configured, producers sign the raw request body
//! and send the result as `X-Notifier-Signature: sha256=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-notifier-signature";

/// Parses `sha256=<hex>` into the raw signature bytes.
///
/// Returns `None` for any other algorithm prefix or invalid hex.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// The header value a producer sends for `payload`.
pub fn sign(payload: &[u8], secret: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Checks `signature_header` against `payload` in constant time.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected) = parse_signature_header(signature_header) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
