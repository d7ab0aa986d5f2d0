// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod google_oauth;
pub mod google_oidc;
pub mod mailer;
pub mod password;
pub mod rate_limiter;
pub mod saga;
pub mod storage;
pub mod token;

pub use google_oauth::GoogleOAuthClient;
pub use google_oidc::{GoogleIdTokenVerifier, GoogleProfile, OidcError};
pub use mailer::{EmailTemplate, MailError, Mailer, MailtrapMailer};
pub use password::PasswordHasher;
pub use rate_limiter::RateLimiter;
pub use saga::Saga;
pub use storage::{GcsStorage, MemoryStorage, ObjectStorage, StorageError};
pub use token::{TokenError, TokenService};
