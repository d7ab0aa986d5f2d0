// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod catalog;
pub mod note;
pub mod review;
pub mod user;

pub use catalog::{NewProfessor, NewSchool, Professor, School};
pub use note::{NewNote, Note};
pub use review::{NewReview, Review};
pub use user::{Invitation, NewUser, Role, User};

use serde::Deserialize;
use validator::Validate;

/// Pagination and search parameters shared by the listing endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 20))]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub search: Option<String>,
}

fn default_limit() -> u32 {
    10
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            search: None,
        }
    }
}

impl PageQuery {
    /// Apply offset/limit to an already filtered, ordered list.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}
