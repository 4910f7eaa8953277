use sha2::{Digest, Sha256};

/// Stable hex digest of a piece of text, used for whole documents and single scopes alike.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash_bytes = hasher.finalize();

    hex::encode(&hash_bytes[..16])
}
