/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use reviewdesk_api::{app::{build_router, identity_verifier, AppState}, config::Config};
/// use reviewdesk_shared::{db::pool::{create_pool, DatabaseConfig}, store::postgres::PgStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let identity = identity_verifier(&config)?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), identity, config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::{Config, IdentityProvider}, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use reviewdesk_shared::{
    auth::{
        audit::AuditSink,
        identity::IdentityVerifier,
        jwt::JwtIdentityVerifier,
        remote::RemoteIdentityVerifier,
        resolver::{AuthResolver, ResolverSettings},
        side_channel::{CronAuthorizer, HmacSha256Verifier, WebhookAuthorizer, WebhookSignatureVerifier},
        tenant::SELECTED_ACCOUNT_HEADER,
    },
    store::{AccountStore, AdminLookup, AuditStore, DefaultAccountLookup},
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Timeout for calls to the identity service
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is behind an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Composed authorization pipeline
    pub resolver: Arc<AuthResolver>,

    /// Account and membership store
    pub accounts: Arc<dyn AccountStore>,

    /// Audit trail, for retention pruning
    pub audit: Arc<dyn AuditStore>,

    /// Scheduled-job gate
    pub cron: CronAuthorizer,

    /// Inbound webhook gate
    pub webhooks: WebhookAuthorizer,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates application state over a single store implementing every trait
    pub fn new<S>(store: Arc<S>, identity: Arc<dyn IdentityVerifier>, config: Config) -> Self
    where
        S: AccountStore + DefaultAccountLookup + AdminLookup + AuditStore + 'static,
    {
        let resolver = AuthResolver::new(
            identity,
            store.clone(),
            store.clone(),
            store.clone(),
            AuditSink::new(store.clone()),
            ResolverSettings {
                session_cookie: config.identity.session_cookie.clone(),
                grace_period: config.tenancy.grace_period,
            },
        );

        let signature_verifier = config.webhooks.signing_secret.as_ref().map(|secret| {
            Arc::new(HmacSha256Verifier::new(secret.as_bytes())) as Arc<dyn WebhookSignatureVerifier>
        });

        Self {
            resolver: Arc::new(resolver),
            accounts: store.clone(),
            audit: store,
            cron: CronAuthorizer::new(config.cron.secret.clone()),
            webhooks: WebhookAuthorizer::new(
                config.webhooks.signature_header.clone(),
                signature_verifier,
            ),
            config: Arc::new(config),
        }
    }
}

/// Builds the identity verifier selected by configuration
///
/// # Errors
///
/// Returns an error if the remote verifier's HTTP client cannot be built
pub fn identity_verifier(config: &Config) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    let verifier: Arc<dyn IdentityVerifier> = match &config.identity.provider {
        IdentityProvider::Jwt { secret, audience } => {
            Arc::new(JwtIdentityVerifier::with_audience(secret, audience))
        }
        IdentityProvider::Remote { url, service_key } => {
            Arc::new(RemoteIdentityVerifier::new(url, service_key, IDENTITY_TIMEOUT)?)
        }
    };

    Ok(verifier)
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Store connectivity (public)
/// └── /v1/
///     ├── GET /me                          # Verified user
///     ├── /account                         # Verified user + resolved account
///     │   ├── GET    /
///     │   ├── GET    /members
///     │   ├── PATCH  /members/:user_id     # Owner only
///     │   └── DELETE /members/:user_id     # Owner only
///     ├── /admin                           # Platform admin
///     │   └── GET    /accounts/:account_id
///     ├── /cron                            # Shared secret
///     │   └── POST   /audit-retention
///     └── /webhooks                        # Signature
///         └── POST   /billing
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authorization (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::middleware::auth;
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let me_routes = Router::new()
        .route("/me", get(routes::me::current_user))
        .layer(from_fn_with_state(state.clone(), auth::user_access));

    let account_routes = Router::new()
        .route("/", get(routes::account::get_account))
        .route("/members", get(routes::members::list_members))
        .layer(from_fn_with_state(state.clone(), auth::account_access));

    // Owner-only, recorded in the audit trail
    let member_management_routes = Router::new()
        .route(
            "/members/:user_id",
            patch(routes::members::update_member_role).delete(routes::members::remove_member),
        )
        .layer(from_fn_with_state(state.clone(), auth::owner_access));

    let admin_routes = Router::new()
        .route("/accounts/:account_id", get(routes::admin::get_account))
        .layer(from_fn_with_state(state.clone(), auth::admin_access));

    let cron_routes = Router::new()
        .route("/audit-retention", post(routes::cron::prune_audit_logs))
        .layer(from_fn_with_state(state.clone(), auth::cron_access));

    let webhook_routes = Router::new().route("/billing", post(routes::webhooks::billing_webhook));

    let v1_routes = Router::new()
        .merge(me_routes)
        .nest("/account", account_routes.merge(member_management_routes))
        .nest("/admin", admin_routes)
        .nest("/cron", cron_routes)
        .nest("/webhooks", webhook_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(SELECTED_ACCOUNT_HEADER),
            ])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
