//! HMAC signatures for printed and displayed QR payloads.
//!
//! Each machine carries its own secret; the signature covers the machine id
//! and, when present, the freshness timestamp. Verification is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex-encoded signature for a machine id and optional timestamp.
pub fn sign(secret: &str, machine_id: &str, ts: Option<&str>) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message(machine_id, ts).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex-encoded signature against the machine secret.
pub fn verify(secret: &str, machine_id: &str, ts: Option<&str>, signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message(machine_id, ts).as_bytes());
    mac.verify_slice(&signature).is_ok()
}

fn message(machine_id: &str, ts: Option<&str>) -> String {
    match ts {
        Some(ts) => format!("{}|{}", machine_id, ts),
        None => machine_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let sig = sign("secret", "007", Some("1700000000"));
        assert!(verify("secret", "007", Some("1700000000"), &sig));
    }

    #[test]
    fn verify_rejects_tampered_machine_id() {
        let sig = sign("secret", "007", None);
        assert!(!verify("secret", "008", None, &sig));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let sig = sign("secret", "007", None);
        assert!(!verify("other", "007", None, &sig));
    }

    #[test]
    fn verify_rejects_non_hex_signature() {
        assert!(!verify("secret", "007", None, "not-hex!"));
    }

    #[test]
    fn timestamp_is_part_of_the_message() {
        let sig = sign("secret", "007", Some("1"));
        assert!(!verify("secret", "007", Some("2"), &sig));
        assert!(!verify("secret", "007", None, &sig));
    }
}
