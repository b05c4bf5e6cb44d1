//! bcrypt hashing for user secrets.
//!
//! Hashing is CPU-bound, so both operations run on tokio's blocking pool instead
//! of the request executor.

use tokio::sync::OnceCell;

use crate::errors::ApiError;

/// Secret assigned to accounts created through `POST /api/users`. Such accounts
/// are flagged `must_reset_password` until the owner changes it.
pub const PLACEHOLDER_PASSWORD: &str = "temp123";

pub async fn hash_password(plain: &str, cost: u32) -> Result<String, ApiError> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

/// Returns `false` for a wrong password and for a stored hash bcrypt cannot parse.
pub async fn verify_password(plain: &str, hash: &str) -> Result<bool, ApiError> {
    let plain = plain.to_owned();
    let hash = hash.to_owned();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be parsed");
            Ok(false)
        }
    }
}

/// Hash checked when a login names no known account, so a miss costs one bcrypt
/// verification like a wrong password does. Built once at the first miss.
static MISS_HASH: OnceCell<String> = OnceCell::const_new();

/// Runs one bcrypt verification at the configured cost and discards the outcome.
pub async fn verify_against_dummy(plain: &str, cost: u32) -> Result<(), ApiError> {
    let hash = MISS_HASH
        .get_or_try_init(|| hash_password(PLACEHOLDER_PASSWORD, cost))
        .await?;
    verify_password(plain, hash).await?;
    Ok(())
}
