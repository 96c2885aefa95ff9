//! HMAC helpers for Razorpay signatures.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 and return the hex-encoded result (64 characters).
///
/// # Errors
///
/// Returns `InvalidLength` if the MAC rejects the key. HMAC accepts keys of
/// any size, so this only surfaces a broken MAC implementation.
pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature against `HMAC_SHA256(secret, message)`.
///
/// The comparison runs in constant time.
#[must_use]
pub fn verify_hmac_sha256_hex(secret: &str, message: &[u8], signature: &str) -> bool {
    hmac_sha256_hex(secret, message)
        .is_ok_and(|expected| constant_time_eq(&expected, &signature.to_ascii_lowercase()))
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
