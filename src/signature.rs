//! Webhook signature verification.
//!
//! The platform signs every callback body with HMAC-SHA1 keyed by the app
//! secret and sends the digest as `X-Hub-Signature: sha1=<hex>`.

use hmac::{Hmac, Mac};
use sha1::Sha1;

pub const SIGNATURE_HEADER: &str = "x-hub-signature";

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Missing,
    Mismatch,
}

/// Check `header` (the raw header value, if any) against `body`
pub fn verify(app_secret: &str, header: Option<&str>, body: &[u8]) -> SignatureCheck {
    let Some(header) = header else {
        return SignatureCheck::Missing;
    };
    let Some((method, digest_hex)) = header.split_once('=') else {
        return SignatureCheck::Mismatch;
    };
    if !method.eq_ignore_ascii_case("sha1") {
        return SignatureCheck::Mismatch;
    }
    let Ok(digest) = hex::decode(digest_hex.trim()) else {
        return SignatureCheck::Mismatch;
    };
    let Ok(mut mac) = HmacSha1::new_from_slice(app_secret.as_bytes()) else {
        return SignatureCheck::Mismatch;
    };
    mac.update(body);
    // Constant-time comparison
    match mac.verify_slice(&digest) {
        Ok(()) => SignatureCheck::Valid,
        Err(_) => SignatureCheck::Mismatch,
    }
}

/// Header value the platform would send for `body`
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(app_secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}
