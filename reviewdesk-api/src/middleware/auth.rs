/// Authorization middleware
///
/// Each function is one reusable wrapper, attached with
/// `axum::middleware::from_fn_with_state`. On success the
/// [`ResolvedContext`] is inserted into request extensions for handlers to
/// extract; on failure the request never reaches the handler.
///
/// Checks that need the operation's target run in the handler. When one of
/// them fails, its [`AuthFailure`] comes back on the response and the
/// wrapper audits it. Logged routes record `api_access` only after the
/// handler succeeded.
///
/// | Wrapper | Stages |
/// |---|---|
/// | [`user_access`] | identity |
/// | [`account_access`] | identity, account, membership |
/// | [`owner_access`] | same, plus the owner role and an `api_access` event |
/// | [`admin_access`] | identity, admin flag, `api_access` event |
/// | [`cron_access`] | cron shared secret only |
///
/// # Example
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, routing::get, Extension, Router};
/// use reviewdesk_api::{app::AppState, middleware::auth::account_access};
/// use reviewdesk_shared::auth::resolver::ResolvedContext;
///
/// async fn handler(Extension(ctx): Extension<ResolvedContext>) -> String {
///     format!("user {}", ctx.user_id())
/// }
///
/// fn routes(state: AppState) -> Router<AppState> {
///     Router::new()
///         .route("/", get(handler))
///         .layer(from_fn_with_state(state, account_access))
/// }
/// ```

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::Response,
};
use reviewdesk_shared::auth::{
    error::AuthFailure,
    resolver::{AuthOptions, RequestMeta, ResolvedContext},
};

use crate::{app::AppState, error::ApiError};

/// Verified user, no account
pub async fn user_access(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, AuthOptions::USER, req, next).await
}

/// Verified user acting on a resolved account
pub async fn account_access(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, AuthOptions::ACCOUNT, req, next).await
}

/// Owner of the resolved account, with an audit record of every success
pub async fn owner_access(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, AuthOptions::OWNER, req, next).await
}

/// Platform admin, account-independent
pub async fn admin_access(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, AuthOptions::ADMIN, req, next).await
}

/// Scheduled jobs
///
/// Checks only the cron secret. No identity, account or membership lookup
/// runs for these requests. Rejections are audited without an actor.
pub async fn cron_access(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(failure) = state.cron.authorize(req.headers()) {
        state
            .resolver
            .record_failure(None, &request_meta(&req), &failure);
        return Err(failure.into());
    }

    Ok(next.run(req).await)
}

async fn authorize(
    state: &AppState,
    options: AuthOptions,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let meta = request_meta(&req);
    let context = state.resolver.authorize(req.headers(), &meta, options).await?;

    req.extensions_mut().insert(context.clone());
    let response = next.run(req).await;

    audit_outcome(state, options, &context, &meta, &response);
    Ok(response)
}

fn audit_outcome(
    state: &AppState,
    options: AuthOptions,
    context: &ResolvedContext,
    meta: &RequestMeta,
    response: &Response,
) {
    if let Some(failure) = response.extensions().get::<AuthFailure>() {
        state.resolver.record_failure(Some(context), meta, failure);
    } else if options.log_access && response.status().is_success() {
        state.resolver.record_access(context, meta);
    }
}

fn request_meta(req: &Request) -> RequestMeta {
    // Nested routers see a stripped path; audit the full one
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    RequestMeta::from_request(req.method(), &path, req.headers())
}
