//! Password hashing and verification using Argon2

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use sqlx::prelude::Type;
use uuid::Uuid;

/// Newtype for PHC formatted password hash, as stored with the user
///
/// The plaintext password never leaves the request that carried it - only this hash is persisted,
/// and the only way to check a password against it is [`PasswordHash::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Type)]
#[sqlx(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the password with Argon2id
    ///
    /// Hashing is deliberately expensive, so it is moved to the blocking pool.
    pub async fn create(password: String) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::create_blocking(&password))
            .await
            .wrap_err("Password hashing task failed")?
    }

    /// Hash of a random password nobody knows
    ///
    /// Verified in place of the stored hash when there is no user to check against, so a failed
    /// lookup costs as much as a wrong password.
    pub async fn placeholder() -> Result<Self> {
        Self::create(Uuid::new_v4().to_string()).await
    }

    /// Hash taken as is, without any format checks
    #[cfg(test)]
    pub(crate) fn from_phc(phc: &str) -> Self {
        Self(phc.to_owned())
    }

    /// Verifies the password against this hash
    pub async fn verify(&self, password: String) -> Result<bool> {
        let hash = self.0.clone();
        tokio::task::spawn_blocking(move || Self::verify_blocking(&hash, &password))
            .await
            .wrap_err("Password verification task failed")?
    }

    fn create_blocking(password: &str) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| eyre!("Cannot hash password: {err}"))?;

        Ok(Self(hash.to_string()))
    }

    fn verify_blocking(hash: &str, password: &str) -> Result<bool> {
        let hash = password_hash::PasswordHash::new(hash)
            .map_err(|err| eyre!("Invalid password hash format: {err}"))?;

        match Argon2::default().verify_password(password.as_bytes(), &hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(eyre!("Cannot verify password: {err}")),
        }
    }
}
