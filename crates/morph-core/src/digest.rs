//! Content fingerprints for schema sources.

use sha2::{Digest, Sha256};

/// Hex-encoded sha256 of the schema text.
///
/// Used by watch mode to detect on-disk changes and echoed in deploy logs
/// so two runs over identical sources are recognizable.
pub fn schema_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = schema_digest("type User { id: ID! }");
        let b = schema_digest("type User { id: ID! }");
        let c = schema_digest("type User { id: ID! name: String }");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
