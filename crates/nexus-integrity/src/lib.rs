//! Subresource-Integrity token computation over raw bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Compute `sha256-<base64>` for `bytes`, the SRI token format used in
/// every persisted `FileEntry.integrity`.
#[must_use]
pub fn sri_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("sha256-{}", STANDARD.encode(digest))
}

/// `true` if `bytes` hashes to the digest embedded in `token` (a
/// `sha256-<base64>` string). Used by tests and by any caller that wants to
/// verify a previously computed token without recomputing it elsewhere.
#[must_use]
pub fn verify_sri_sha256(bytes: &[u8], token: &str) -> bool {
    sri_sha256(bytes) == token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_known_digest() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        let token = sri_sha256(b"");
        assert_eq!(
            token,
            "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn same_bytes_produce_same_token() {
        let a = sri_sha256(b"module.exports = 42;");
        let b = sri_sha256(b"module.exports = 42;");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_produce_different_tokens() {
        let a = sri_sha256(b"a");
        let b = sri_sha256(b"b");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_round_trips() {
        let bytes = b"console.log('hi');";
        let token = sri_sha256(bytes);
        assert!(verify_sri_sha256(bytes, &token));
        assert!(!verify_sri_sha256(b"tampered", &token));
    }

    #[test]
    fn token_has_sha256_prefix() {
        let token = sri_sha256(b"x");
        assert!(token.starts_with("sha256-"));
    }
}
