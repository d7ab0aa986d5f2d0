// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Schools, professors and catalog search.

use crate::error::{AppError, Result};
use crate::middleware::role::{require_role, RoleGate};
use crate::middleware::{require_auth, AuthUser};
use crate::models::user::ADMIN_ROLE;
use crate::models::{NewProfessor, NewSchool, PageQuery, Professor, School};
use crate::routes::extract::{AppJson, AppPath, AppQuery};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Schools returned by `/school/random`.
const RANDOM_SCHOOLS: usize = 3;

pub fn routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let gate: RoleGate = (state.clone(), ADMIN_ROLE);

    // Layers run bottom-up: identity first, then the role check.
    let admin = Router::new()
        .route("/school", post(create_school))
        .route("/school/{school_id}", post(create_professor))
        .route_layer(middleware::from_fn_with_state(gate, require_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/search/schools", get(search_schools))
        .route("/search/professor", get(search_professors))
        .route("/search/professor/{school_id}", get(professors_for_school))
        .route("/school/random", get(random_schools))
        .route("/school/{school_id}", get(get_school))
        .merge(admin)
}

// ─── Search ──────────────────────────────────────────────────

async fn search_schools(
    State(state): State<Arc<AppState>>,
    AppQuery(page): AppQuery<PageQuery>,
) -> Result<Json<Vec<School>>> {
    page.validate()?;
    Ok(Json(state.db.search_schools(&page).await?))
}

async fn search_professors(
    State(state): State<Arc<AppState>>,
    AppQuery(page): AppQuery<PageQuery>,
) -> Result<Json<Vec<Professor>>> {
    page.validate()?;
    Ok(Json(state.db.search_professors(&page).await?))
}

async fn professors_for_school(
    State(state): State<Arc<AppState>>,
    AppPath(school_id): AppPath<u64>,
    AppQuery(page): AppQuery<PageQuery>,
) -> Result<Json<Vec<Professor>>> {
    page.validate()?;
    if state.db.get_school(school_id).await?.is_none() {
        return Err(AppError::NotFound(format!("School {} not found", school_id)));
    }
    Ok(Json(state.db.professors_for_school(school_id, &page).await?))
}

// ─── Schools ─────────────────────────────────────────────────

async fn get_school(
    State(state): State<Arc<AppState>>,
    AppPath(school_id): AppPath<u64>,
) -> Result<Json<School>> {
    let school = state
        .db
        .get_school(school_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("School {} not found", school_id)))?;
    Ok(Json(school))
}

async fn random_schools(State(state): State<Arc<AppState>>) -> Result<Json<Vec<School>>> {
    Ok(Json(state.db.random_schools(RANDOM_SCHOOLS).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSchoolRequest {
    #[validate(length(min = 2, max = 40))]
    pub name: String,
    #[validate(length(min = 2, max = 40))]
    pub address: String,
}

async fn create_school(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<CreateSchoolRequest>,
) -> Result<(StatusCode, Json<School>)> {
    payload.validate()?;

    let school = state
        .db
        .create_school(NewSchool {
            name: payload.name,
            address: payload.address,
        })
        .await?;

    tracing::info!(school_id = school.id, user_id = user.id(), "School created");
    Ok((StatusCode::CREATED, Json(school)))
}

// ─── Professors ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfessorRequest {
    #[validate(length(min = 2, max = 40))]
    pub name: String,
    #[validate(length(min = 2, max = 40))]
    pub subject: String,
}

/// Add a professor to a school; the school must exist.
async fn create_professor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppPath(school_id): AppPath<u64>,
    AppJson(payload): AppJson<CreateProfessorRequest>,
) -> Result<(StatusCode, Json<Professor>)> {
    payload.validate()?;

    let professor = state
        .db
        .create_professor(NewProfessor {
            name: payload.name,
            subject: payload.subject,
            school_id,
        })
        .await?;

    tracing::info!(
        professor_id = professor.id,
        school_id,
        user_id = user.id(),
        "Professor created"
    );
    Ok((StatusCode::CREATED, Json(professor)))
}
