// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! School and professor models.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A school that professors belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct School {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub address: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
}

impl NewSchool {
    pub fn into_school(self, id: u64, created_at: String) -> School {
        School {
            id,
            name: self.name,
            address: self.address,
            created_at,
        }
    }
}

/// A professor that can be reviewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Professor {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub subject: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub school_id: u64,
}

#[derive(Debug, Clone)]
pub struct NewProfessor {
    pub name: String,
    pub subject: String,
    pub school_id: u64,
}

impl NewProfessor {
    pub fn into_professor(self, id: u64) -> Professor {
        Professor {
            id,
            name: self.name,
            subject: self.subject,
            school_id: self.school_id,
        }
    }
}

/// Case-insensitive substring match used by the search endpoints.
pub fn matches_search(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(n) if n.trim().is_empty() => true,
        Some(n) => haystack.to_lowercase().contains(&n.trim().to_lowercase()),
    }
}
