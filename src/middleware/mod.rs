// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, roles, throttling, security).

pub mod auth;
pub mod rate_limit;
pub mod role;
pub mod security;

pub use auth::{require_auth, AuthUser};
pub use rate_limit::rate_limit;
pub use role::require_role;
