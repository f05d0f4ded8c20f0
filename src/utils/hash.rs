//! Content identity hashing for markdown artifacts.
//!
//! The checksum is computed over NFC-normalized text so that visually
//! identical pages produced by different renderers hash identically.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Compute the canonical checksum of a markdown artifact.
///
/// NFC-normalizes the input, then returns the lowercase hex SHA-256 digest.
/// This is the only identity function for page content; the in-browser
/// stability signature is a separate, unrelated hash.
pub fn content_checksum(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_hex_sha256() {
        let digest = content_checksum("Ocean-view rooms from $199.");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }

    #[test]
    fn test_checksum_stable_across_calls() {
        let a = content_checksum("# Amenities\n\n- Pool\n- Spa");
        let b = content_checksum("# Amenities\n\n- Pool\n- Spa");
        assert_eq!(a, b);
    }

    #[test]
    fn test_nfc_equivalent_forms_hash_identically() {
        // "é" composed vs decomposed.
        let composed = "Caf\u{00e9}";
        let decomposed = "Cafe\u{0301}";
        assert_ne!(composed, decomposed);
        assert_eq!(content_checksum(composed), content_checksum(decomposed));
    }

    #[test]
    fn test_distinct_content_distinct_hash() {
        assert_ne!(
            content_checksum("rooms from $199"),
            content_checksum("rooms from $229")
        );
    }
}
