use sha2::Digest;
use sha2::Sha256;

/// Deterministic cache key for a query within an optional scope.
///
/// Query and scope are length-delimited before hashing, and "no scope" is
/// encoded differently from every concrete scope, so distinct pairs never
/// share a key.
pub fn cache_key(query: &str, scope: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update((query.len() as u64).to_le_bytes());
    hasher.update(query.as_bytes());

    match scope {
        None => hasher.update([0u8]),
        Some(scope) => {
            hasher.update([1u8]);
            hasher.update((scope.len() as u64).to_le_bytes());
            hasher.update(scope.as_bytes());
        }
    }

    format!("{:x}", hasher.finalize())
}
