// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review model and its storage-level constraints.

use crate::db::StoreError;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const MIN_DIFFICULTY: i32 = 1;
pub const MAX_DIFFICULTY: i32 = 10;
pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Tags a review may carry.
pub const REVIEW_TAGS: &[&str] = &[
    "Califica Duro",
    "Muchas Tareas",
    "Clases Excelentes",
    "Respetado por los Estudiantes",
    "Tomaría su clase otra vez",
    "Asistencia Obligatoria",
    "Deja trabajos largos",
    "Barco",
    "Las clases son largas",
    "Los exámenes son difíciles",
    "Los exámenes son fáciles",
    "No enseña nada",
];

/// A stored review of a professor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Review {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub text: String,
    pub subject: String,
    pub difficulty: i32,
    pub rating: i32,
    pub would_take_again: bool,
    pub tags: Vec<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub professor_id: u64,
    pub created_at: String,
}

/// Review fields supplied by the author; `id` and `created_at` come from the store.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub text: String,
    pub subject: String,
    pub difficulty: i32,
    pub rating: i32,
    pub would_take_again: bool,
    pub tags: Vec<String>,
    pub user_id: u64,
    pub professor_id: u64,
}

impl NewReview {
    /// Range checks enforced at insert time, inside the write transaction.
    pub fn check_constraints(&self) -> Result<(), StoreError> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(StoreError::Validation(format!(
                "difficulty must be between {MIN_DIFFICULTY} and {MAX_DIFFICULTY}"
            )));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(StoreError::Validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        Ok(())
    }

    pub fn into_review(self, id: u64, created_at: String) -> Review {
        Review {
            id,
            text: self.text,
            subject: self.subject,
            difficulty: self.difficulty,
            rating: self.rating,
            would_take_again: self.would_take_again,
            tags: self.tags,
            user_id: self.user_id,
            professor_id: self.professor_id,
            created_at,
        }
    }
}

/// Distinct tags across a set of reviews, in first-seen order.
pub fn distinct_tags(reviews: &[Review]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in reviews.iter().flat_map(|r| r.tags.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_review(difficulty: i32, rating: i32) -> NewReview {
        NewReview {
            text: "Great lectures".to_string(),
            subject: "Calculus".to_string(),
            difficulty,
            rating,
            would_take_again: true,
            tags: vec![],
            user_id: 1,
            professor_id: 2,
        }
    }

    #[test]
    fn constraints_accept_bounds() {
        assert!(new_review(1, 1).check_constraints().is_ok());
        assert!(new_review(10, 5).check_constraints().is_ok());
    }

    #[test]
    fn constraints_reject_difficulty_out_of_range() {
        match new_review(11, 3).check_constraints() {
            Err(StoreError::Validation(msg)) => {
                assert_eq!(msg, "difficulty must be between 1 and 10")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(new_review(0, 3).check_constraints().is_err());
    }

    #[test]
    fn constraints_reject_rating_out_of_range() {
        assert!(matches!(
            new_review(5, 6).check_constraints(),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn distinct_tags_dedupes() {
        let mut a = new_review(3, 3).into_review(1, String::new());
        a.tags = vec!["Barco".to_string(), "Muchas Tareas".to_string()];
        let mut b = new_review(3, 3).into_review(2, String::new());
        b.tags = vec!["Barco".to_string()];

        assert_eq!(distinct_tags(&[a, b]), vec!["Barco", "Muchas Tareas"]);
    }
}
