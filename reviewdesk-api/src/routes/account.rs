/// Resolved account endpoint
///
/// # Endpoint
///
/// ```text
/// GET /v1/account
/// Authorization: Bearer <token>
/// X-Selected-Account: <account id>   (optional)
/// ```
///
/// # Response
///
/// ```json
/// {
///   "id": "0b4c5d1e-...",
///   "name": "Corner Bakery",
///   "plan": "pro",
///   "user_limit": 5,
///   "role": "owner",
///   "resolved_by": "membership",
///   "created_at": "2026-03-01T10:00:00Z"
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use reviewdesk_shared::{
    auth::{resolver::ResolvedContext, tenant::TenantSource},
    models::membership::MembershipRole,
};
use serde::Serialize;
use uuid::Uuid;

/// Account summary for the caller
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub plan: String,
    pub user_limit: i32,

    /// Caller's role in the account
    pub role: MembershipRole,

    /// How the account was selected for this request
    pub resolved_by: TenantSource,

    pub created_at: DateTime<Utc>,
}

/// Returns the account the request resolved to
pub async fn get_account(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResolvedContext>,
) -> ApiResult<Json<AccountResponse>> {
    let tenant = ctx.tenant()?;

    let account = state
        .accounts
        .find_account(tenant.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    Ok(Json(AccountResponse {
        id: account.id,
        name: account.name,
        plan: account.plan,
        user_limit: account.user_limit,
        role: tenant.role,
        resolved_by: tenant.source,
        created_at: account.created_at,
    }))
}
