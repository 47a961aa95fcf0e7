/// Request authorization resolver
///
/// Composes the individual stages into the single check every privileged
/// operation goes through:
///
/// ```text
/// credentials → identity → [tenant → membership → [owner]] → [admin]
/// ```
///
/// The bracketed stages run only when [`AuthOptions`] asks for them. The
/// first failing stage ends resolution and is written to the audit sink
/// without waiting. Successful access is recorded separately through
/// [`AuthResolver::record_access`], once the operation itself succeeded.
///
/// The returned [`ResolvedContext`] belongs to one request. It is never
/// stored or reused, so each request sees current membership data.

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use super::audit::AuditSink;
use super::authorization::{require_admin, require_owner, verify_membership};
use super::credentials::extract_credentials;
use super::error::AuthFailure;
use super::identity::{resolve_identity, IdentityVerifier, User};
use super::tenant::{GracePeriod, TenantResolver, TenantSource};
use crate::models::audit::{AuditEventType, AuditSeverity};
use crate::models::membership::MembershipRole;
use crate::store::{AccountStore, AdminLookup, DefaultAccountLookup};

/// Default session cookie name
pub const DEFAULT_SESSION_COOKIE: &str = "rd-access-token";

/// Which stages a route needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthOptions {
    /// Resolve an account and verify membership
    pub require_account: bool,

    /// Require the owner role in the resolved account
    pub require_owner: bool,

    /// Require the platform admin flag
    pub require_admin: bool,

    /// Record an `api_access` event when the operation succeeds
    pub log_access: bool,
}

impl AuthOptions {
    /// Verified user only
    pub const USER: AuthOptions = AuthOptions {
        require_account: false,
        require_owner: false,
        require_admin: false,
        log_access: false,
    };

    /// Verified user acting on an account
    pub const ACCOUNT: AuthOptions = AuthOptions {
        require_account: true,
        require_owner: false,
        require_admin: false,
        log_access: false,
    };

    /// Owner of the resolved account, always logged
    pub const OWNER: AuthOptions = AuthOptions {
        require_account: true,
        require_owner: true,
        require_admin: false,
        log_access: true,
    };

    /// Platform admin, independent of any account
    pub const ADMIN: AuthOptions = AuthOptions {
        require_account: false,
        require_owner: false,
        require_admin: true,
        log_access: true,
    };
}

/// Network and routing metadata recorded with audit events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestMeta {
    /// `METHOD path`
    pub endpoint: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// Collects metadata from the request line and headers
    ///
    /// The client address is the first `X-Forwarded-For` hop, falling back to
    /// `X-Real-IP`.
    pub fn from_request(method: &Method, path: &str, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let ip_address = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header("x-real-ip"))
            .map(str::to_string);

        Self {
            endpoint: format!("{} {}", method, path),
            ip_address,
            user_agent: header("user-agent").map(str::to_string),
        }
    }

    fn details(&self) -> Map<String, JsonValue> {
        let mut details = Map::new();
        details.insert("endpoint".into(), json!(self.endpoint));
        details.insert("ip_address".into(), json!(self.ip_address));
        details.insert("user_agent".into(), json!(self.user_agent));
        details
    }
}

/// Account a request is authorized to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantAccess {
    pub account_id: Uuid,
    pub role: MembershipRole,
    pub source: TenantSource,
}

/// Outcome of a successful authorization
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub user: User,

    /// Present when the route required an account
    pub tenant: Option<TenantAccess>,

    /// True only when the admin flag was checked and set
    pub is_admin: bool,
}

impl ResolvedContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// The resolved account, or 403 if the route did not resolve one
    pub fn tenant(&self) -> Result<&TenantAccess, AuthFailure> {
        self.tenant.as_ref().ok_or(AuthFailure::TenantUnresolved)
    }
}

/// Resolver settings fixed at startup
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub session_cookie: String,
    pub grace_period: GracePeriod,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            grace_period: GracePeriod::default(),
        }
    }
}

/// The composed authorization pipeline
pub struct AuthResolver {
    identity: Arc<dyn IdentityVerifier>,
    accounts: Arc<dyn AccountStore>,
    defaults: Arc<dyn DefaultAccountLookup>,
    admins: Arc<dyn AdminLookup>,
    audit: AuditSink,
    settings: ResolverSettings,
}

impl AuthResolver {
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        accounts: Arc<dyn AccountStore>,
        defaults: Arc<dyn DefaultAccountLookup>,
        admins: Arc<dyn AdminLookup>,
        audit: AuditSink,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            identity,
            accounts,
            defaults,
            admins,
            audit,
            settings,
        }
    }

    /// Authorizes a request
    ///
    /// # Errors
    ///
    /// Returns the first stage's failure. See [`AuthFailure`] for the status
    /// each variant maps to.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        meta: &RequestMeta,
        options: AuthOptions,
    ) -> Result<ResolvedContext, AuthFailure> {
        let credentials = extract_credentials(headers, &self.settings.session_cookie);

        let user = match resolve_identity(self.identity.as_ref(), &credentials).await {
            Ok(user) => user,
            Err(failure) => return Err(self.reject(None, None, meta, failure)),
        };

        let tenant = if options.require_account {
            match self.resolve_account(headers, &user).await {
                Ok(tenant) => Some(tenant),
                Err((account_id, failure)) => {
                    return Err(self.reject(Some(user.id), account_id, meta, failure))
                }
            }
        } else {
            None
        };

        if options.require_owner {
            let owner_check = tenant
                .ok_or(AuthFailure::TenantUnresolved)
                .and_then(|t| require_owner(t.role));
            if let Err(failure) = owner_check {
                let account_id = tenant.map(|t| t.account_id);
                return Err(self.reject(Some(user.id), account_id, meta, failure));
            }
        }

        if options.require_admin {
            if let Err(failure) = require_admin(self.admins.as_ref(), &user).await {
                let account_id = tenant.map(|t| t.account_id);
                return Err(self.reject(Some(user.id), account_id, meta, failure));
            }
        }

        debug!(user_id = %user.id, endpoint = %meta.endpoint, "Request authorized");

        Ok(ResolvedContext {
            user,
            tenant,
            is_admin: options.require_admin,
        })
    }

    async fn resolve_account(
        &self,
        headers: &HeaderMap,
        user: &User,
    ) -> Result<TenantAccess, (Option<Uuid>, AuthFailure)> {
        let resolver = TenantResolver {
            accounts: self.accounts.as_ref(),
            defaults: self.defaults.as_ref(),
            grace_period: self.settings.grace_period,
        };

        let resolution = resolver
            .resolve(headers, user, Utc::now())
            .await
            .map_err(|f| (None, f))?;

        let role = verify_membership(self.accounts.as_ref(), user, resolution.account_id)
            .await
            .map_err(|f| (Some(resolution.account_id), f))?;

        Ok(TenantAccess {
            account_id: resolution.account_id,
            role,
            source: resolution.source,
        })
    }

    /// Records a successful privileged operation as `api_access`
    pub fn record_access(&self, context: &ResolvedContext, meta: &RequestMeta) {
        let mut details = meta.details();
        if let Some(t) = &context.tenant {
            details.insert("account_id".into(), json!(t.account_id));
            details.insert("role".into(), json!(t.role.as_str()));
        }
        if context.is_admin {
            details.insert("admin".into(), json!(true));
        }

        self.audit.log(
            Some(context.user_id()),
            AuditEventType::ApiAccess,
            JsonValue::Object(details),
            AuditSeverity::Info,
        );
    }

    /// Records a failure raised outside the resolver's own stages
    ///
    /// Used for checks that need the operation's target, and for side
    /// channels that never resolve a user.
    pub fn record_failure(
        &self,
        context: Option<&ResolvedContext>,
        meta: &RequestMeta,
        failure: &AuthFailure,
    ) {
        let actor_id = context.map(ResolvedContext::user_id);
        let account_id = context.and_then(|c| c.tenant).map(|t| t.account_id);
        self.audit_failure(actor_id, account_id, meta, failure);
    }

    fn reject(
        &self,
        actor_id: Option<Uuid>,
        account_id: Option<Uuid>,
        meta: &RequestMeta,
        failure: AuthFailure,
    ) -> AuthFailure {
        self.audit_failure(actor_id, account_id, meta, &failure);
        failure
    }

    fn audit_failure(
        &self,
        actor_id: Option<Uuid>,
        account_id: Option<Uuid>,
        meta: &RequestMeta,
        failure: &AuthFailure,
    ) {
        let severity = match failure {
            AuthFailure::Internal(_) => AuditSeverity::Error,
            _ => AuditSeverity::Warning,
        };

        let mut details = meta.details();
        details.insert("reason".into(), json!(failure.reason()));
        if let Some(id) = account_id {
            details.insert("account_id".into(), json!(id));
        }

        self.audit.log(
            actor_id,
            AuditEventType::AuthFailure,
            JsonValue::Object(details),
            severity,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_identity_token, IdentityClaims, JwtIdentityVerifier};
    use crate::auth::tenant::SELECTED_ACCOUNT_HEADER;
    use crate::models::account::AccountPlan;
    use crate::store::memory::InMemoryStore;
    use axum::http::{header, HeaderValue, StatusCode};
    use std::time::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    struct Fixture {
        store: Arc<InMemoryStore>,
        resolver: AuthResolver,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let resolver = AuthResolver::new(
            Arc::new(JwtIdentityVerifier::new(SECRET)),
            store.clone(),
            store.clone(),
            store.clone(),
            AuditSink::new(store.clone()),
            ResolverSettings::default(),
        );
        Fixture { store, resolver }
    }

    fn headers_for(user_id: Uuid, account: Option<Uuid>) -> HeaderMap {
        let token =
            create_identity_token(&IdentityClaims::for_user(user_id, "u@example.com"), SECRET)
                .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        if let Some(id) = account {
            headers.insert(
                SELECTED_ACCOUNT_HEADER,
                HeaderValue::from_str(&id.to_string()).unwrap(),
            );
        }
        headers
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            endpoint: "GET /v1/account".into(),
            ip_address: Some("203.0.113.7".into()),
            user_agent: Some("test".into()),
        }
    }

    async fn wait_for_events(store: &InMemoryStore, count: usize) -> Vec<crate::models::audit::AuditEvent> {
        for _ in 0..100 {
            let events = store.audit_events().await;
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.audit_events().await
    }

    #[test]
    fn test_request_meta() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let meta = RequestMeta::from_request(&Method::PATCH, "/v1/account/members/x", &headers);
        assert_eq!(meta.endpoint, "PATCH /v1/account/members/x");
        assert_eq!(meta.ip_address.as_deref(), Some("198.51.100.4"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));

        headers.remove("x-forwarded-for");
        let meta = RequestMeta::from_request(&Method::GET, "/", &headers);
        assert_eq!(meta.ip_address.as_deref(), Some("10.0.0.9"));
    }

    #[tokio::test]
    async fn test_user_only_skips_tenant_lookups() {
        let f = fixture();
        let user_id = Uuid::new_v4();

        let ctx = f
            .resolver
            .authorize(&headers_for(user_id, None), &meta(), AuthOptions::USER)
            .await
            .unwrap();

        assert_eq!(ctx.user_id(), user_id);
        assert!(ctx.tenant.is_none());
        assert_eq!(f.store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_account_resolution_with_role() {
        let f = fixture();
        let user_id = Uuid::new_v4();
        let account = f
            .store
            .insert_account("Bakery", AccountPlan::Pro, None, Utc::now())
            .await;
        f.store
            .insert_membership(account.id, user_id, MembershipRole::Member)
            .await;

        let ctx = f
            .resolver
            .authorize(&headers_for(user_id, Some(account.id)), &meta(), AuthOptions::ACCOUNT)
            .await
            .unwrap();

        let tenant = ctx.tenant().unwrap();
        assert_eq!(tenant.account_id, account.id);
        assert_eq!(tenant.role, MembershipRole::Member);
        assert_ne!(tenant.account_id, user_id);
    }

    #[tokio::test]
    async fn test_creator_grace_still_requires_membership() {
        let f = fixture();
        let user_id = Uuid::new_v4();
        let account = f
            .store
            .insert_account("Fresh", AccountPlan::Free, Some(user_id), Utc::now())
            .await;

        let err = f
            .resolver
            .authorize(&headers_for(user_id, Some(account.id)), &meta(), AuthOptions::ACCOUNT)
            .await
            .unwrap_err();
        assert_eq!(err, AuthFailure::MembershipDenied { account_id: account.id });

        f.store
            .insert_membership(account.id, user_id, MembershipRole::Owner)
            .await;
        assert!(f
            .resolver
            .authorize(&headers_for(user_id, Some(account.id)), &meta(), AuthOptions::ACCOUNT)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failure_is_audited() {
        let f = fixture();

        let err = f
            .resolver
            .authorize(&HeaderMap::new(), &meta(), AuthOptions::ACCOUNT)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let events = wait_for_events(&f.store, 1).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "auth_failure");
        assert!(events[0].actor_id.is_none());
        assert_eq!(events[0].details["reason"], "unauthenticated");
        assert_eq!(events[0].details["ip_address"], "203.0.113.7");
    }

    #[tokio::test]
    async fn test_admin_access_recorded_on_request() {
        let f = fixture();
        let admin = Uuid::new_v4();
        f.store.insert_admin(admin).await;

        let ctx = f
            .resolver
            .authorize(&headers_for(admin, None), &meta(), AuthOptions::ADMIN)
            .await
            .unwrap();
        assert!(ctx.is_admin);

        // Authorizing alone records nothing
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(f.store.audit_events().await.is_empty());

        f.resolver.record_access(&ctx, &meta());

        let events = wait_for_events(&f.store, 1).await;
        assert_eq!(events[0].event_type, "api_access");
        assert_eq!(events[0].actor_id, Some(admin));
        assert_eq!(events[0].details["admin"], true);

        let err = f
            .resolver
            .authorize(&headers_for(Uuid::new_v4(), None), &meta(), AuthOptions::ADMIN)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_owner_stage_denies_member() {
        let f = fixture();
        let member = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let account = f
            .store
            .insert_account("Bakery", AccountPlan::Pro, Some(owner), Utc::now())
            .await;
        f.store
            .insert_membership(account.id, owner, MembershipRole::Owner)
            .await;
        f.store
            .insert_membership(account.id, member, MembershipRole::Member)
            .await;

        let err = f
            .resolver
            .authorize(&headers_for(member, None), &meta(), AuthOptions::OWNER)
            .await
            .unwrap_err();
        assert_eq!(err, AuthFailure::InsufficientRole { required: "owner" });

        let events = wait_for_events(&f.store, 1).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "auth_failure");
        assert_eq!(events[0].actor_id, Some(member));
        assert_eq!(events[0].details["reason"], "insufficient_role");
        assert_eq!(events[0].details["account_id"], account.id.to_string());

        let ctx = f
            .resolver
            .authorize(&headers_for(owner, None), &meta(), AuthOptions::OWNER)
            .await
            .unwrap();
        assert_eq!(ctx.tenant().unwrap().role, MembershipRole::Owner);
    }

    #[tokio::test]
    async fn test_record_failure_without_user() {
        let f = fixture();

        let failure = AuthFailure::Unauthenticated("invalid cron token".into());
        f.resolver.record_failure(None, &meta(), &failure);

        let events = wait_for_events(&f.store, 1).await;
        assert_eq!(events[0].event_type, "auth_failure");
        assert!(events[0].actor_id.is_none());
        assert_eq!(events[0].details["reason"], "unauthenticated");
        assert!(events[0].details.get("account_id").is_none());
    }
}
