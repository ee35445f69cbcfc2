//! # Payment callback signature format
//!
//! When the gateway reports a completed payment, the report travels through the buyer's browser, so the engine
//! cannot trust any field of it as-is. Anyone could claim that an order was paid and have their goods shipped for
//! free.
//!
//! The gateway therefore signs the callback with a secret that is shared only between the gateway and this server.
//! The message is the gateway's order identifier and payment identifier joined with a pipe:
//!
//! ```text
//!     {gateway_order_id}|{gateway_payment_id}
//! ```
//!
//! and the signature is the hex-encoded HMAC-SHA256 of that message under the shared secret. The verifier
//! recomputes the signature locally and compares it in constant time against the client-supplied value. Any
//! mismatch is terminal for the verification call: the audit ledger records a failure and nothing else mutates.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use shop_common::Secret;

type HmacSha256 = Hmac<Sha256>;

fn signature_message(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    format!("{gateway_order_id}|{gateway_payment_id}")
}

/// The hex-encoded HMAC-SHA256 signature for the given gateway order and payment identifiers.
pub fn payment_signature(secret: &Secret<String>, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    let message = signature_message(gateway_order_id, gateway_payment_id);
    // HMAC accepts keys of any length, so new_from_slice cannot fail
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a client-supplied signature against the locally recomputed one. The comparison is constant-time;
/// a malformed (non-hex) signature simply fails verification.
pub fn verify_payment_signature(
    secret: &Secret<String>,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    provided: &str,
) -> bool {
    let decoded = match hex::decode(provided.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let message = signature_message(gateway_order_id, gateway_payment_id);
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    mac.verify_slice(&decoded).is_ok()
}
