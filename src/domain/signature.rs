//! Checkout callback authentication.
//!
//! The gateway signs `order_id + "|" + payment_id` with HMAC-SHA256 keyed by
//! the merchant secret and hands the hex digest to the browser, which posts
//! it back to us. Comparison goes through `Mac::verify_slice`, which is
//! constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(order_id: &str, payment_id: &str, secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC can take key of any size"),
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac
}

/// Hex-encoded signature for an order/payment pair.
pub fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
    hex::encode(mac_for(order_id, payment_id, secret).finalize().into_bytes())
}

/// `true` only when `signature` is the lowercase hex HMAC of the pair, byte
/// for byte as the gateway emits it. Blank inputs, uppercase digits and
/// undecodable hex are a plain `false`, never an error.
pub fn verify(payment_id: &str, order_id: &str, signature: &str, secret: &str) -> bool {
    if payment_id.is_empty() || order_id.is_empty() || signature.is_empty() || secret.is_empty() {
        return false;
    }
    // `hex::decode` folds case; the wire form does not.
    if !signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    mac_for(order_id, payment_id, secret)
        .verify_slice(&expected)
        .is_ok()
}
