// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study notes with attached files.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A note uploaded by a user for a professor's course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Note {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub title: String,
    pub subject: String,
    pub content: String,
    /// Public URLs of the uploaded files
    pub files_url: Vec<String>,
    /// Owner; only this user may delete the note
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub professor_id: u64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub subject: String,
    pub content: String,
    pub files_url: Vec<String>,
    pub user_id: u64,
    pub professor_id: u64,
}

impl NewNote {
    pub fn into_note(self, id: u64, created_at: String) -> Note {
        Note {
            id,
            title: self.title,
            subject: self.subject,
            content: self.content,
            files_url: self.files_url,
            user_id: self.user_id,
            professor_id: self.professor_id,
            created_at,
        }
    }
}

impl Note {
    pub fn is_owned_by(&self, user_id: u64) -> bool {
        self.user_id == user_id
    }
}
