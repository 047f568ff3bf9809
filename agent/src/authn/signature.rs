//! GitHub-style webhook signatures
//!
//! The signature is `sha1=` followed by the hex HMAC-SHA1 of the raw request
//! body, keyed with the shared secret.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

const SIGNATURE_PREFIX: &str = "sha1=";

fn new_mac(secret: &SecretString, body: &[u8]) -> Option<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
    mac.update(body);
    Some(mac)
}

/// Compute the signature header value for a body
///
/// Returns `None` if the secret is not a valid HMAC key.
pub fn sign(secret: &SecretString, body: &[u8]) -> Option<String> {
    let mac = new_mac(secret, body)?;
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a signature header value against a body in constant time
///
/// The digest is compared as bytes, so surrounding whitespace and upper-case
/// hex are accepted. The `sha1=` prefix must match exactly.
pub fn verify(secret: &SecretString, body: &[u8], signature: Option<&str>) -> bool {
    let Some(digest) = signature.and_then(|s| s.trim().strip_prefix(SIGNATURE_PREFIX)) else {
        return false;
    };
    let Ok(digest) = hex::decode(digest) else {
        return false;
    };

    new_mac(secret, body).is_some_and(|mac| mac.verify_slice(&digest).is_ok())
}
