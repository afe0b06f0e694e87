//! Argon2id password hashing for accounts that register with a password.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;
use crate::Result;

/// Hashes a password with a random salt and returns the PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

/// Returns `Ok(false)` for a wrong password and `Err` only for an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::InternalError(format!("Stored password hash is invalid: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::InternalError(e.to_string())),
    }
}

/// Runs a hashing job on tokio's blocking pool so Argon2 never stalls a
/// server worker thread.
async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::InternalError(format!("Password task failed: {}", e)))?
}

pub async fn hash_password_off_thread(password: String) -> Result<String> {
    run_blocking(move || hash_password(&password)).await
}

pub async fn verify_password_off_thread(password: String, hash: String) -> Result<bool> {
    run_blocking(move || verify_password(&password, &hash)).await
}
