// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use reviews_api::config::Config;
use reviews_api::db::store::seed_default_roles;
use reviews_api::db::{DataStore, FirestoreDb, MemoryDb};
use reviews_api::models::{NewUser, Role, User};
use reviews_api::routes::create_router;
use reviews_api::services::{
    EmailTemplate, MailError, Mailer, MemoryStorage, PasswordHasher,
};
use reviews_api::AppState;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// A message captured by [`RecordingMailer`].
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct SentMail {
    pub template: &'static str,
    pub recipient_email: String,
    pub activation_url: String,
    pub sandbox: bool,
}

/// Mailer that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
}

#[allow(dead_code)]
impl RecordingMailer {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Plaintext activation token from the newest invitation.
    pub fn last_activation_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let url = &sent.last()?.activation_url;
        url.rsplit_once("/activate/").map(|(_, t)| t.to_string())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        template: &EmailTemplate,
        _recipient_name: &str,
        recipient_email: &str,
        sandbox: bool,
    ) -> Result<u16, MailError> {
        let EmailTemplate::UserInvitation { activation_url, .. } = template;
        self.sent.lock().unwrap().push(SentMail {
            template: template.name(),
            recipient_email: recipient_email.to_string(),
            activation_url: activation_url.clone(),
            sandbox,
        });
        Ok(200)
    }
}

/// Mailer whose provider is always down.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(
        &self,
        _template: &EmailTemplate,
        _recipient_name: &str,
        _recipient_email: &str,
        _sandbox: bool,
    ) -> Result<u16, MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}

/// Full application over in-memory collaborators.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    /// Same tables the router uses
    pub db: MemoryDb,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<MemoryStorage>,
}

/// Cheap Argon2 parameters so tests stay fast.
#[allow(dead_code)]
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::with_params(1024, 1, 1).unwrap()
}

/// Create a test app with a recording mailer.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), None).await
}

/// Create a test app; `mailer` replaces the recording mailer when given.
#[allow(dead_code)]
pub async fn create_test_app_with(config: Config, mailer: Option<Arc<dyn Mailer>>) -> TestApp {
    let db = MemoryDb::new();
    seed_default_roles(&db).await.unwrap();

    let recording = Arc::new(RecordingMailer::default());
    let storage = Arc::new(MemoryStorage::new());
    let state = Arc::new(
        AppState::new(
            config,
            Arc::new(db.clone()),
            mailer.unwrap_or_else(|| recording.clone() as Arc<dyn Mailer>),
            storage.clone(),
            test_hasher(),
        )
        .unwrap(),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        mailer: recording,
        storage,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Insert an active account with the given role and return it with a
    /// session token.
    pub async fn user_with_role(&self, name: &str, role: &str) -> (User, String) {
        let role: Role = self.state.db.get_role_by_name(role).await.unwrap().unwrap();
        let user = self
            .state
            .db
            .upsert_oauth_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: None,
                is_active: true,
                role,
            })
            .await
            .unwrap();
        let token = self.state.tokens.issue_session(user.id).unwrap();
        (user, token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// JSON request with an optional bearer token.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Bodiless request with an optional bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
