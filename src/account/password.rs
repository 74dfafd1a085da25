/// Password hashing with Argon2id
///
/// Hashing is CPU-bound, so both operations run on the blocking pool.
use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tokio::sync::OnceCell;

/// Hash compared against when no account matches, so both login failures cost one verify
static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Hash a plaintext password into a PHC string
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// Check a plaintext password against a stored PHC string.
///
/// A malformed stored hash is treated as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed = match PasswordHash::new(&hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
}

/// Run a full verification against a throwaway hash. Always false.
pub async fn verify_dummy_password(password: &str) -> AppResult<bool> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_password("dummy-password-never-matches"))
        .await?;
    verify_password(password, hash).await?;
    Ok(false)
}
