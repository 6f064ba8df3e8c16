// Caller-submitted credential material.

use crate::utils::masking::{hash_key, mask_key};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One caller-submitted Gemini API key.
///
/// The raw material is zeroized on drop and never printed: `Debug` and logs
/// see the masked form, metrics and persistence see the sha256 identity.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw key material, for the upstream auth header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked rendering for logs and error payloads.
    pub fn masked(&self) -> String {
        mask_key(&self.0)
    }

    /// Stable hashed identity for metrics and persistence.
    pub fn hashed(&self) -> String {
        hash_key(&self.0)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_shows_raw_material() {
        let key = ApiKey::new("AIzaSySecretMaterial123");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("SecretMaterial"));
        assert!(debug.contains("AIza"));
    }

    #[test]
    fn test_hash_matches_raw_hash() {
        let key = ApiKey::new("some-key");
        assert_eq!(key.hashed(), crate::utils::masking::hash_key("some-key"));
    }
}
