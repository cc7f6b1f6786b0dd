//! Common test utilities for integration tests
//!
//! - Database connection and migrations
//! - Organizer and agent fixtures with access tokens
//! - A notifier that records instead of sending, and one that always fails
//! - Request helpers driving the router in-process
//!
//! Requires `DATABASE_URL` and `JWT_SECRET` to point at a disposable
//! PostgreSQL database.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use leadcrm_api::{
    app::{build_router, AppState},
    config::Config,
};
use leadcrm_shared::{
    auth::jwt::{create_token, Claims, TokenType},
    db::migrations::run_migrations,
    models::{
        agent::Agent,
        user::{CreateUser, User, UserRole},
        user_profile::UserProfile,
    },
    notify::{Notification, Notifier, NotifyError},
};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Notifier that keeps every notification in memory
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

impl RecordingNotifier {
    pub fn sent_to(&self, address: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.recipients.iter().any(|r| r == address))
            .cloned()
            .collect()
    }
}

/// Notifier whose relay is always down; counts the attempts
#[derive(Default)]
pub struct FailingNotifier {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Transport("relay unreachable".to_string()))
    }
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// An organizer with its organization and token
pub struct TestOrganizer {
    pub user: User,
    pub organization: UserProfile,
    pub token: String,
}

/// An agent with its record and token
pub struct TestAgent {
    pub user: User,
    pub agent: Agent,
    pub token: String,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
    pub notifier: Arc<RecordingNotifier>,
    created_users: Mutex<Vec<Uuid>>,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let notifier = Arc::new(RecordingNotifier::default());
        Self::build(notifier.clone(), notifier).await
    }

    /// Serves the app with `app_notifier` in place of the recording one
    pub async fn with_notifier(app_notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        Self::build(app_notifier, Arc::new(RecordingNotifier::default())).await
    }

    async fn build(
        app_notifier: Arc<dyn Notifier>,
        notifier: Arc<RecordingNotifier>,
    ) -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;
        run_migrations(&db).await?;

        let state = AppState::new(db.clone(), config.clone(), app_notifier);
        let app = build_router(state);

        Ok(Self {
            db,
            app,
            config,
            notifier,
            created_users: Mutex::new(Vec::new()),
        })
    }

    fn token_for(&self, user_id: Uuid) -> anyhow::Result<String> {
        let claims = Claims::new(user_id, TokenType::Access);
        Ok(create_token(&claims, &self.config.jwt.secret)?)
    }

    async fn create_user(&self, role: UserRole) -> anyhow::Result<(User, UserProfile)> {
        let suffix = Uuid::new_v4().simple().to_string();
        let created = User::create(
            &self.db,
            CreateUser {
                username: format!("{}-{}", role.as_str(), suffix),
                email: format!("{}@example.com", suffix),
                first_name: "Test".to_string(),
                last_name: role.as_str().to_string(),
                password_hash: "not-a-real-hash".to_string(),
                role,
            },
        )
        .await?;

        self.created_users.lock().unwrap().push(created.0.id);
        Ok(created)
    }

    pub async fn organizer(&self) -> anyhow::Result<TestOrganizer> {
        let (user, organization) = self.create_user(UserRole::Organizer).await?;
        let token = self.token_for(user.id)?;

        Ok(TestOrganizer {
            user,
            organization,
            token,
        })
    }

    /// Creates an agent of `organizer` directly in the database
    pub async fn agent_of(&self, organizer: &TestOrganizer) -> anyhow::Result<TestAgent> {
        let (user, _profile) = self.create_user(UserRole::Agent).await?;

        let mut conn = self.db.acquire().await?;
        let agent = Agent::create_in(&mut *conn, user.id, organizer.organization.id).await?;
        let token = self.token_for(user.id)?;

        Ok(TestAgent { user, agent, token })
    }

    /// A user with no role
    pub async fn unassigned_user(&self) -> anyhow::Result<(User, String)> {
        let (user, _profile) = self.create_user(UserRole::Unassigned).await?;
        let token = self.token_for(user.id)?;
        Ok((user, token))
    }

    /// Sends a request through the router and returns status and JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Creates a lead as `organizer` and returns its id
    pub async fn create_lead(&self, organizer: &TestOrganizer, first_name: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/v1/leads",
                &organizer.token,
                serde_json::json!({
                    "first_name": first_name,
                    "last_name": "Lead",
                    "age": 30,
                    "phone_number": "555-0100",
                    "email": "lead@example.com"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "create lead failed: {}", body);
        body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Deletes every user created through this context
    ///
    /// Organizer deletion cascades to their organization's records.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        let ids: Vec<Uuid> = self.created_users.lock().unwrap().drain(..).collect();
        for id in ids {
            User::delete(&self.db, id).await?;
        }
        Ok(())
    }
}

/// Returns the ids in a JSON array of records
pub fn ids(list: &Value) -> Vec<Uuid> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str()?.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Polls `condition` until it holds or `timeout_secs` elapse
pub async fn wait_for<F>(condition: F, timeout_secs: u64) -> anyhow::Result<()>
where
    F: Fn() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);

    loop {
        if condition() {
            return Ok(());
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Condition not met within {} seconds", timeout_secs);
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
