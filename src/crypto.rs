// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random values and digests.

use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

/// Fill `N` bytes from the OS CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], anyhow::Error> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| anyhow::anyhow!("system random source failed"))?;
    Ok(buf)
}

/// Random value as lowercase hex (`2 * N` characters).
pub fn random_hex<const N: usize>() -> Result<String, anyhow::Error> {
    Ok(hex::encode(random_bytes::<N>()?))
}

/// Random non-zero document identifier.
///
/// Limited to 53 bits so JavaScript clients can represent it exactly.
pub fn random_id() -> Result<u64, anyhow::Error> {
    loop {
        let id = u64::from_be_bytes(random_bytes::<8>()?) >> 11;
        if id != 0 {
            return Ok(id);
        }
    }
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
