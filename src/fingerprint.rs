//! Content fingerprinting for media deduplication

use sha2::{Digest, Sha256};

/// SHA-256 digest of the exact media bytes, as lowercase hex.
///
/// Used as the cache key and reported to callers as the `hash` field.
/// No content normalization is attempted: the same image re-encoded
/// hashes differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaFingerprint(String);

impl MediaFingerprint {
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(64);
        for byte in digest {
            hex.push_str(&format!("{:02x}", byte));
        }
        MediaFingerprint(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
