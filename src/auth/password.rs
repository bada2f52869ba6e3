//! Password hashing behind an opaque hash+compare surface.
//!
//! bcrypt at the default cost takes a noticeable amount of CPU time, so both
//! operations run on the blocking thread pool instead of stalling the
//! request executor.

use anyhow::Result;

/// Hash a password with bcrypt at the default cost.
pub async fn hash_password(password: String) -> Result<String> {
    let hash =
        tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST)).await??;
    Ok(hash)
}

/// Compare a password against a stored bcrypt hash.
///
/// A hash that bcrypt cannot parse is a stored-data error, not a mismatch,
/// and surfaces as `Err`.
pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    // MIN_COST keeps these tests fast; the handlers use DEFAULT_COST.
    // bcrypt doesn't export its MIN_COST (4), so mirror it here.
    const MIN_COST: u32 = 4;

    #[tokio::test]
    async fn test_verify_accepts_matching_password() {
        let hash = bcrypt::hash("password123", MIN_COST).unwrap();
        assert!(verify_password("password123".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_password() {
        let hash = bcrypt::hash("password123", MIN_COST).unwrap();
        assert!(!verify_password("hunter2hunter2".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_errors_on_garbage_hash() {
        let result = verify_password("password123".into(), "not-a-bcrypt-hash".into()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let a = hash_password("password123".into()).await.unwrap();
        let b = hash_password("password123".into()).await.unwrap();
        assert_ne!(a, b);
    }
}
