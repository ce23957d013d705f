//! Helpers for deriving point identifiers and hashing chunk payloads.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace for chunk point ids; fixed so that ids survive restarts.
const CHUNK_POINT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a7e_93b4_4d5a_8e0f_5c3b_1d27_a941);

/// Deterministic point id for the chunk at `chunk_index` of `document_id`.
///
/// Qdrant only accepts UUIDs or integers as ids, so the `(document, chunk)` key is folded into a
/// name-based UUID. Re-indexing the same key therefore overwrites the earlier point.
pub fn chunk_point_id(document_id: &str, chunk_index: usize) -> String {
    Uuid::new_v5(
        &CHUNK_POINT_NAMESPACE,
        format!("{document_id}:{chunk_index}").as_bytes(),
    )
    .to_string()
}

/// Compute a deterministic SHA-256 hash for arbitrary content.
pub fn compute_chunk_hash(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_hash_is_stable() {
        let h1 = compute_chunk_hash("Hello world");
        let h2 = compute_chunk_hash(b"Hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn point_ids_are_deterministic_per_key() {
        assert_eq!(chunk_point_id("doc-a", 3), chunk_point_id("doc-a", 3));
        assert_ne!(chunk_point_id("doc-a", 3), chunk_point_id("doc-a", 4));
        assert_ne!(chunk_point_id("doc-a", 3), chunk_point_id("doc-b", 3));
        assert!(Uuid::parse_str(&chunk_point_id("doc-a", 0)).is_ok());
    }
}
