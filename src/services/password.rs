// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Argon2id password hashing.
//!
//! Hashing and verification run on the blocking pool so they do not stall
//! the async workers.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    /// OWASP baseline: 19 MiB memory, 2 iterations, 1 lane.
    fn default() -> Self {
        Self {
            params: Params::DEFAULT,
        }
    }
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost parameters, e.g. cheap ones for tests.
    pub fn with_params(
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, argon2::Error> {
        Ok(Self {
            params: Params::new(memory_cost, time_cost, parallelism, None)?,
        })
    }

    /// Hash a password into a PHC string.
    pub async fn hash(&self, password: String) -> anyhow::Result<String> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))
        })
        .await?
    }

    /// Check a password against a stored PHC string.
    ///
    /// An unparsable stored hash is an error, a mismatch is `Ok(false)`.
    pub async fn verify(&self, password: String, hash: String) -> anyhow::Result<bool> {
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| anyhow::anyhow!("stored password hash is invalid: {}", e))?;
            // Cost parameters come from the PHC string.
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::with_params(1024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));

        assert!(hasher
            .verify("correct horse".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!hasher.verify("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn salts_differ() {
        let hasher = cheap();
        let a = hasher.hash("pw".to_string()).await.unwrap();
        let b = hasher.hash("pw".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn garbage_hash_is_an_error() {
        let hasher = cheap();
        assert!(hasher
            .verify("pw".to_string(), "not-a-phc-string".to_string())
            .await
            .is_err());
    }
}
