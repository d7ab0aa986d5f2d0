// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs. They are stateless: nothing is stored server-side,
//! so a token stays valid until it expires and cannot be revoked early.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Not before (Unix timestamp, equal to `iat`)
    pub nbf: u64,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("token is malformed")]
    Malformed,

    /// Well-formed and correctly signed, but for another issuer or audience.
    #[error("token issuer or audience does not match")]
    InvalidClaims,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and verifies session tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    session_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], issuer: &str, audience: &str, session_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            session_ttl,
        }
    }

    /// Issue a token valid from now until `now + ttl`.
    pub fn issue(
        &self,
        subject: &str,
        issuer: &str,
        audience: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(
            subject,
            issuer,
            audience,
            ttl,
            jsonwebtoken::get_current_timestamp(),
        )
    }

    pub fn issue_at(
        &self,
        subject: &str,
        issuer: &str,
        audience: &str,
        ttl: Duration,
        now: u64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl.as_secs()),
            iss: issuer.to_string(),
            aud: audience.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issue a session token for a user with the configured issuer,
    /// audience and lifetime.
    pub fn issue_session(&self, user_id: u64) -> Result<String, TokenError> {
        self.issue(
            &user_id.to_string(),
            &self.issuer,
            &self.audience,
            self.session_ttl,
        )
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, jsonwebtoken::get_current_timestamp())
    }

    /// Verify a token as of `now` (Unix seconds).
    ///
    /// A token is expired once `now >= exp`.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<String, TokenError> {
        // Time checks are done below against `now`, without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["sub", "exp", "nbf", "iss", "aud"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::MissingRequiredClaim(_) => TokenError::InvalidClaims,
                _ => TokenError::Malformed,
            })?
            .claims;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.nbf > now {
            return Err(TokenError::NotYetValid);
        }

        Ok(claims.sub)
    }
}
