//! Callback signing: `hex(HMAC_SHA256(secret, "{unix_ms}.{body}"))`.
//!
//! The timestamp is part of the signed payload, so a receiver re-binding
//! the transmitted timestamp detects both body and timestamp tampering.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the millisecond timestamp the body was signed with.
pub const TIMESTAMP_HEADER: &str = "X-Courier-Timestamp";

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "X-Courier-Signature";

fn mac(secret: &[u8], unix_ms: i64, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("hmac-sha256 accepts keys of any length");
    mac.update(unix_ms.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

/// Sign a callback body.
#[must_use]
pub fn sign(secret: &[u8], unix_ms: i64, body: &[u8]) -> String {
    hex::encode(mac(secret, unix_ms, body).finalize().into_bytes())
}

/// Verify a received signature in constant time.
#[must_use]
pub fn verify(secret: &[u8], unix_ms: i64, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    mac(secret, unix_ms, body).verify_slice(&signature).is_ok()
}
