// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! [`DataStore`] implemented over any [`Documents`] backend.
//!
//! Every backend call goes through [`timed`]. Multi-document writes that
//! depend on a precondition read use [`run_in_transaction`].

use crate::db::collections;
use crate::db::{run_in_transaction, timed, DataStore, Documents, StoreError, Transaction};
use crate::models::catalog::matches_search;
use crate::models::{
    Invitation, NewNote, NewProfessor, NewReview, NewSchool, NewUser, Note, PageQuery, Professor,
    Review, Role, School, User,
};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Newest first; IDs break ties between documents created in the same second.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (&str, u64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl<D: Documents> DataStore for D {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        timed("get_user", self.get(collections::USERS, &id.to_string())).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users: Vec<User> = timed(
            "get_user_by_email",
            self.find_by(collections::USERS, "email", email.into()),
        )
        .await?;
        Ok(users.into_iter().next())
    }

    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let user = user.into_user(self.next_id()?, now_rfc3339());
        let invitation = Invitation {
            token_hash: token_hash.to_string(),
            user_id: user.id,
            expires_at: format_utc_rfc3339(expires_at),
        };

        let tx = timed("begin_transaction", self.begin()).await?;
        let user = timed(
            "create_and_invite",
            run_in_transaction(tx, move |tx| {
                Box::pin(async move {
                    let same_email: Vec<User> = tx
                        .find_by(collections::USERS, "email", user.email.as_str().into())
                        .await?;
                    if !same_email.is_empty() {
                        return Err(StoreError::Duplicate("email"));
                    }
                    let same_name: Vec<User> = tx
                        .find_by(collections::USERS, "username", user.username.as_str().into())
                        .await?;
                    if !same_name.is_empty() {
                        return Err(StoreError::Duplicate("username"));
                    }

                    tx.put(collections::USERS, &user.id.to_string(), &user)?;
                    tx.put(collections::INVITATIONS, &invitation.token_hash, &invitation)?;
                    Ok(user)
                })
            }),
        )
        .await?;

        tracing::info!(user_id = user.id, "User created with pending invitation");
        Ok(user)
    }

    async fn delete_user(&self, id: u64) -> Result<(), StoreError> {
        let tx = timed("begin_transaction", self.begin()).await?;
        timed(
            "delete_user",
            run_in_transaction(tx, move |tx| {
                Box::pin(async move {
                    let invitations: Vec<Invitation> = tx
                        .find_by(collections::INVITATIONS, "user_id", id.into())
                        .await?;
                    for invitation in &invitations {
                        tx.delete(collections::INVITATIONS, &invitation.token_hash)?;
                    }
                    tx.delete(collections::USERS, &id.to_string())
                })
            }),
        )
        .await?;

        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn activate_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let token_hash = token_hash.to_string();
        let tx = timed("begin_transaction", self.begin()).await?;
        timed(
            "activate_user",
            run_in_transaction(tx, move |tx| {
                Box::pin(async move {
                    let invitation: Invitation = tx
                        .get(collections::INVITATIONS, &token_hash)
                        .await?
                        .ok_or(StoreError::NotFound)?;
                    if !invitation.is_valid_at(now) {
                        return Err(StoreError::NotFound);
                    }

                    let mut user: User = tx
                        .get(collections::USERS, &invitation.user_id.to_string())
                        .await?
                        .ok_or(StoreError::NotFound)?;
                    user.is_active = true;

                    tx.put(collections::USERS, &user.id.to_string(), &user)?;
                    tx.delete(collections::INVITATIONS, &token_hash)?;
                    Ok(user)
                })
            }),
        )
        .await
    }

    async fn upsert_oauth_user(&self, user: NewUser) -> Result<User, StoreError> {
        let candidate = user.into_user(self.next_id()?, now_rfc3339());
        let tx = timed("begin_transaction", self.begin()).await?;
        let (user, created) = timed(
            "upsert_oauth_user",
            run_in_transaction(tx, move |tx| {
                Box::pin(async move {
                    let existing: Vec<User> = tx
                        .find_by(collections::USERS, "email", candidate.email.as_str().into())
                        .await?;
                    let Some(mut user) = existing.into_iter().next() else {
                        tx.put(collections::USERS, &candidate.id.to_string(), &candidate)?;
                        return Ok((candidate, true));
                    };

                    // The provider has verified the address, which is what
                    // an invitation would have proven.
                    if candidate.is_active && !user.is_active {
                        let invitations: Vec<Invitation> = tx
                            .find_by(collections::INVITATIONS, "user_id", user.id.into())
                            .await?;
                        for invitation in &invitations {
                            tx.delete(collections::INVITATIONS, &invitation.token_hash)?;
                        }
                        user.is_active = true;
                        tx.put(collections::USERS, &user.id.to_string(), &user)?;
                    }
                    Ok((user, false))
                })
            }),
        )
        .await?;

        if created {
            tracing::info!(user_id = user.id, "User created from OAuth profile");
        }
        Ok(user)
    }

    async fn get_invitation(&self, token_hash: &str) -> Result<Option<Invitation>, StoreError> {
        timed(
            "get_invitation",
            self.get(collections::INVITATIONS, token_hash),
        )
        .await
    }

    // ─── Roles ───────────────────────────────────────────────────

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        timed("get_role", self.get(collections::ROLES, name)).await
    }

    async fn put_role(&self, role: &Role) -> Result<(), StoreError> {
        timed("put_role", self.put(collections::ROLES, &role.name, role)).await
    }

    // ─── Schools and professors ──────────────────────────────────

    async fn create_school(&self, school: NewSchool) -> Result<School, StoreError> {
        let school = school.into_school(self.next_id()?, now_rfc3339());
        timed(
            "create_school",
            self.put(collections::SCHOOLS, &school.id.to_string(), &school),
        )
        .await?;
        Ok(school)
    }

    async fn get_school(&self, id: u64) -> Result<Option<School>, StoreError> {
        timed("get_school", self.get(collections::SCHOOLS, &id.to_string())).await
    }

    async fn search_schools(&self, page: &PageQuery) -> Result<Vec<School>, StoreError> {
        let mut schools: Vec<School> =
            timed("list_schools", self.list(collections::SCHOOLS)).await?;
        schools.retain(|s| matches_search(&s.name, page.search.as_deref()));
        schools.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page.apply(schools))
    }

    async fn random_schools(&self, limit: usize) -> Result<Vec<School>, StoreError> {
        let mut schools: Vec<School> =
            timed("list_schools", self.list(collections::SCHOOLS)).await?;
        // Partial Fisher-Yates: only the first `limit` slots need shuffling.
        let n = schools.len();
        for i in 0..limit.min(n) {
            let bytes = crate::crypto::random_bytes::<4>().map_err(StoreError::backend)?;
            let r = u32::from_be_bytes(bytes);
            let j = i + (r as usize) % (n - i);
            schools.swap(i, j);
        }
        schools.truncate(limit);
        Ok(schools)
    }

    async fn create_professor(&self, professor: NewProfessor) -> Result<Professor, StoreError> {
        let professor = professor.into_professor(self.next_id()?);
        let tx = timed("begin_transaction", self.begin()).await?;
        timed(
            "create_professor",
            run_in_transaction(tx, move |tx| {
                Box::pin(async move {
                    let school: Option<School> = tx
                        .get(collections::SCHOOLS, &professor.school_id.to_string())
                        .await?;
                    if school.is_none() {
                        return Err(StoreError::NotFound);
                    }
                    tx.put(
                        collections::PROFESSORS,
                        &professor.id.to_string(),
                        &professor,
                    )?;
                    Ok(professor)
                })
            }),
        )
        .await
    }

    async fn get_professor(&self, id: u64) -> Result<Option<Professor>, StoreError> {
        timed(
            "get_professor",
            self.get(collections::PROFESSORS, &id.to_string()),
        )
        .await
    }

    async fn professors_for_school(
        &self,
        school_id: u64,
        page: &PageQuery,
    ) -> Result<Vec<Professor>, StoreError> {
        let mut professors: Vec<Professor> = timed(
            "professors_for_school",
            self.find_by(collections::PROFESSORS, "school_id", school_id.into()),
        )
        .await?;
        professors.retain(|p| matches_search(&p.name, page.search.as_deref()));
        professors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page.apply(professors))
    }

    async fn search_professors(&self, page: &PageQuery) -> Result<Vec<Professor>, StoreError> {
        let mut professors: Vec<Professor> =
            timed("list_professors", self.list(collections::PROFESSORS)).await?;
        professors.retain(|p| matches_search(&p.name, page.search.as_deref()));
        professors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page.apply(professors))
    }

    // ─── Reviews ─────────────────────────────────────────────────

    async fn create_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let id = self.next_id()?;
        let tx = timed("begin_transaction", self.begin()).await?;
        let review = timed(
            "create_review",
            run_in_transaction(tx, move |tx| {
                Box::pin(async move {
                    let professor: Option<Professor> = tx
                        .get(collections::PROFESSORS, &review.professor_id.to_string())
                        .await?;
                    if professor.is_none() {
                        return Err(StoreError::NotFound);
                    }
                    review.check_constraints()?;

                    let review = review.into_review(id, now_rfc3339());
                    tx.put(collections::REVIEWS, &review.id.to_string(), &review)?;
                    Ok(review)
                })
            }),
        )
        .await?;

        tracing::info!(
            review_id = review.id,
            professor_id = review.professor_id,
            user_id = review.user_id,
            "Review created"
        );
        Ok(review)
    }

    async fn reviews_for_professor(&self, professor_id: u64) -> Result<Vec<Review>, StoreError> {
        let mut reviews: Vec<Review> = timed(
            "reviews_for_professor",
            self.find_by(collections::REVIEWS, "professor_id", professor_id.into()),
        )
        .await?;
        newest_first(&mut reviews, |r| (r.created_at.as_str(), r.id));
        Ok(reviews)
    }

    // ─── Notes ───────────────────────────────────────────────────

    async fn create_note(&self, note: NewNote) -> Result<Note, StoreError> {
        let id = self.next_id()?;
        let tx = timed("begin_transaction", self.begin()).await?;
        timed(
            "create_note",
            run_in_transaction(tx, move |tx| {
                Box::pin(async move {
                    let professor: Option<Professor> = tx
                        .get(collections::PROFESSORS, &note.professor_id.to_string())
                        .await?;
                    if professor.is_none() {
                        return Err(StoreError::NotFound);
                    }

                    let note = note.into_note(id, now_rfc3339());
                    tx.put(collections::NOTES, &note.id.to_string(), &note)?;
                    Ok(note)
                })
            }),
        )
        .await
    }

    async fn get_note(&self, id: u64) -> Result<Option<Note>, StoreError> {
        timed("get_note", self.get(collections::NOTES, &id.to_string())).await
    }

    async fn delete_note(&self, id: u64) -> Result<(), StoreError> {
        timed(
            "delete_note",
            self.delete(collections::NOTES, &id.to_string()),
        )
        .await
    }

    async fn notes_for_professor(&self, professor_id: u64) -> Result<Vec<Note>, StoreError> {
        let mut notes: Vec<Note> = timed(
            "notes_for_professor",
            self.find_by(collections::NOTES, "professor_id", professor_id.into()),
        )
        .await?;
        newest_first(&mut notes, |n| (n.created_at.as_str(), n.id));
        Ok(notes)
    }
}

/// Insert any default role that is not present yet.
pub async fn seed_default_roles(store: &dyn DataStore) -> Result<(), StoreError> {
    for role in Role::defaults() {
        if store.get_role_by_name(&role.name).await?.is_none() {
            store.put_role(&role).await?;
            tracing::info!(role = %role.name, level = role.level, "Seeded role");
        }
    }
    Ok(())
}
