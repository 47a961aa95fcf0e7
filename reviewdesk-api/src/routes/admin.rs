/// Platform admin endpoints
///
/// Admin access is a flag on the user, not a role in any account. These
/// routes resolve no account and read any account by id.
///
/// # Endpoints
///
/// - `GET /v1/admin/accounts/:account_id` - Inspect an account and its members

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiPath,
    routes::members::MemberResponse,
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use reviewdesk_shared::auth::resolver::ResolvedContext;
use serde::Serialize;
use uuid::Uuid;

/// Admin view of an account
#[derive(Debug, Serialize)]
pub struct AdminAccountResponse {
    pub id: Uuid,
    pub name: String,
    pub plan: String,
    pub user_limit: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub members: Vec<MemberResponse>,
}

/// Returns an account with its members
pub async fn get_account(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResolvedContext>,
    ApiPath(account_id): ApiPath<Uuid>,
) -> ApiResult<Json<AdminAccountResponse>> {
    let account = state
        .accounts
        .find_account(account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    let members = state.accounts.list_members(account_id).await?;

    tracing::info!(admin_id = %ctx.user_id(), %account_id, "Admin viewed account");

    Ok(Json(AdminAccountResponse {
        id: account.id,
        name: account.name,
        plan: account.plan,
        user_limit: account.user_limit,
        created_by: account.created_by,
        created_at: account.created_at,
        updated_at: account.updated_at,
        members: members.into_iter().map(MemberResponse::from).collect(),
    }))
}
