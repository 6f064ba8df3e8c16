// Credential masking and hashing.
//
// Raw key material must never reach a log sink, an error payload or the
// persistence layer. Logs get the masked form; metrics and persistence get
// the sha256-hex identity.

use sha2::{Digest, Sha256};

const MASK: &str = "************";

/// Stable identity for a credential, safe to persist and label metrics with.
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Masked rendering: short prefix and suffix around a fixed-width mask.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", prefix, MASK, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_reveals_only_edges() {
        let masked = mask_key("AIzaSyABC123xyz7890");
        assert_eq!(masked, "AIza************7890");
        assert!(!masked.contains("ABC123"));
    }

    #[test]
    fn test_short_keys_fully_masked() {
        assert_eq!(mask_key("abc"), "****");
        assert_eq!(mask_key("12345678"), "****");
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let a = hash_key("key-one");
        let b = hash_key("key-one");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash_key("key-two"), a);
    }
}
