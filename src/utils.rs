use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Header carrying the HMAC-SHA256 signature of an inbound event body.
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

/// Signature header value for `payload`, as the orchestrator side sends it.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify an inbound event signature ("sha256=<hex>").
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    let Some(signature) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    match hex_decode(signature) {
        Ok(signature_bytes) => mac.verify_slice(&signature_bytes).is_ok(),
        Err(_) => {
            error!("Signature verification failed: signature is not valid hex");
            false
        }
    }
}
