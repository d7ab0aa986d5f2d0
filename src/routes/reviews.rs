// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Professor reviews.

use crate::error::{AppError, Result};
use crate::middleware::{rate_limit, require_auth, AuthUser};
use crate::models::review::{distinct_tags, REVIEW_TAGS};
use crate::models::{NewReview, Professor, Review};
use crate::routes::extract::{AppJson, AppPath};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    // Throttling runs before authentication.
    let write = Router::new()
        .route("/reviews/{professor_id}", post(create_review))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/professor/{id}", get(get_professor_reviews))
        .merge(write)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub difficulty: i32,
    pub rating: i32,
    #[serde(default)]
    pub would_take_again: bool,
    #[serde(default)]
    #[validate(length(max = 12))]
    pub tags: Vec<String>,
}

/// Tags must come from the fixed vocabulary.
fn check_tags(tags: &[String]) -> Result<()> {
    match tags.iter().find(|t| !REVIEW_TAGS.contains(&t.as_str())) {
        Some(tag) => Err(AppError::Validation(format!("unknown tag '{}'", tag))),
        None => Ok(()),
    }
}

/// Post a review. Difficulty and rating ranges are enforced by the store
/// inside the insert transaction.
async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppPath(professor_id): AppPath<u64>,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    payload.validate()?;
    check_tags(&payload.tags)?;

    let review = state
        .db
        .create_review(NewReview {
            text: payload.text,
            subject: payload.subject,
            difficulty: payload.difficulty,
            rating: payload.rating,
            would_take_again: payload.would_take_again,
            tags: payload.tags,
            user_id: user.id(),
            professor_id,
        })
        .await?;

    tracing::info!(
        review_id = review.id,
        professor_id,
        user_id = user.id(),
        "Review created"
    );
    Ok((StatusCode::CREATED, Json(review)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfessorReviewsResponse {
    pub professor: Professor,
    pub reviews: Vec<Review>,
    /// Distinct tags across all reviews
    pub tags: Vec<String>,
}

async fn get_professor_reviews(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<u64>,
) -> Result<Json<ProfessorReviewsResponse>> {
    let professor = state
        .db
        .get_professor(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Professor {} not found", id)))?;
    let reviews = state.db.reviews_for_professor(id).await?;

    Ok(Json(ProfessorReviewsResponse {
        tags: distinct_tags(&reviews),
        professor,
        reviews,
    }))
}
