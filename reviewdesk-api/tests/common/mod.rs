//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - In-memory store seeded with accounts, members and admins
//! - Identity token minting against the test secret
//! - Request helpers driving the router with `oneshot`

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use reviewdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use reviewdesk_shared::{
    auth::{
        jwt::{create_identity_token, IdentityClaims, JwtIdentityVerifier},
        tenant::SELECTED_ACCOUNT_HEADER,
    },
    models::{
        account::{Account, AccountPlan},
        membership::MembershipRole,
    },
    store::{memory::InMemoryStore, AccountStore},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const CRON_SECRET: &str = "integration-cron-secret";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub app: Router,
    pub config: Config,

    /// Account owned by `owner`, with `member` as a plain member
    pub account: Account,
    pub owner: Uuid,
    pub member: Uuid,
}

impl TestContext {
    /// Creates a new context over an empty in-memory store
    pub async fn new() -> anyhow::Result<Self> {
        let config = test_config()?;
        let store = Arc::new(InMemoryStore::new());

        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();

        let account = store
            .insert_account("Corner Bakery", AccountPlan::Pro, Some(owner), Utc::now())
            .await;
        store
            .insert_membership(account.id, owner, MembershipRole::Owner)
            .await;
        store
            .insert_membership(account.id, member, MembershipRole::Member)
            .await;

        let state = AppState::new(
            store.clone(),
            Arc::new(JwtIdentityVerifier::new(JWT_SECRET)),
            config.clone(),
        );

        Ok(TestContext {
            store,
            app: build_router(state),
            config,
            account,
            owner,
            member,
        })
    }

    /// Returns a bearer header value for the given user
    pub fn auth_header(&self, user_id: Uuid) -> String {
        format!("Bearer {}", token_for(user_id))
    }

    /// Sends a request and returns status plus JSON body
    ///
    /// The body is `Value::Null` when the response is empty or not JSON.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        account_hint: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user_id) = user {
            builder = builder.header(header::AUTHORIZATION, self.auth_header(user_id));
        }
        if let Some(hint) = account_hint {
            builder = builder.header(SELECTED_ACCOUNT_HEADER, hint);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.oneshot(request).await
    }

    /// Drives a prepared request through the router
    pub async fn oneshot(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Role of a user in the context's account, if still a member
    pub async fn member_role(&self, user_id: Uuid) -> Option<MembershipRole> {
        self.store
            .find_membership(user_id, self.account.id)
            .await
            .unwrap()
            .map(|m| m.role)
    }

    /// Waits until `count` audit events of the given type were recorded
    pub async fn wait_for_audit(&self, event_type: &str, count: usize) {
        wait_for(
            move || async move { self.audit_count(event_type).await == count },
            2,
        )
        .await
        .unwrap();
    }

    /// Number of audit events with the given type
    pub async fn audit_count(&self, event_type: &str) -> usize {
        self.store
            .audit_events()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

/// Configuration with every side channel enabled
pub fn test_config() -> anyhow::Result<Config> {
    Config::from_vars(|key| {
        let value = match key {
            "DATABASE_URL" => "postgresql://localhost/reviewdesk_test",
            "IDENTITY_JWT_SECRET" => JWT_SECRET,
            "CRON_SECRET_TOKEN" => CRON_SECRET,
            "WEBHOOK_SIGNING_SECRET" => WEBHOOK_SECRET,
            _ => return None,
        };
        Some(value.to_string())
    })
}

/// Mints an identity token for a confirmed user
pub fn token_for(user_id: Uuid) -> String {
    let claims = IdentityClaims::for_user(user_id, &format!("{}@example.com", user_id));
    create_identity_token(&claims, JWT_SECRET).unwrap()
}

/// Helper to wait for condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout_secs: u64) -> anyhow::Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);

    loop {
        if condition().await {
            return Ok(());
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Condition not met within {} seconds", timeout_secs);
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
}
