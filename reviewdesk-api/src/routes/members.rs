/// Account member endpoints
///
/// Listing is open to every member of the resolved account. Changing roles
/// and removing members is owner-only (enforced by the route's
/// authorization wrapper), and an owner can never act on their own
/// membership or on another owner's.
///
/// # Endpoints
///
/// - `GET /v1/account/members` - List members
/// - `PATCH /v1/account/members/:user_id` - Change a member's role
/// - `DELETE /v1/account/members/:user_id` - Remove a member

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use reviewdesk_shared::{
    auth::{
        authorization::{check_member_removal, check_role_change},
        resolver::ResolvedContext,
    },
    models::membership::{Membership, MembershipRole},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Change role request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMemberRoleRequest {
    /// New role: `owner`, `member` or `support`
    #[validate(length(min = 1, max = 32, message = "Role is required"))]
    pub role: String,
}

/// Member list item
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

impl From<Membership> for MemberResponse {
    fn from(m: Membership) -> Self {
        Self {
            user_id: m.user_id,
            role: m.role,
            joined_at: m.created_at,
        }
    }
}

/// List members response
#[derive(Debug, Serialize)]
pub struct ListMembersResponse {
    pub account_id: Uuid,
    pub members: Vec<MemberResponse>,
}

/// Remove member response
#[derive(Debug, Serialize)]
pub struct RemoveMemberResponse {
    pub removed: bool,
}

/// Lists the members of the resolved account
pub async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResolvedContext>,
) -> ApiResult<Json<ListMembersResponse>> {
    let tenant = ctx.tenant()?;

    let members = state.accounts.list_members(tenant.account_id).await?;

    Ok(Json(ListMembersResponse {
        account_id: tenant.account_id,
        members: members.into_iter().map(MemberResponse::from).collect(),
    }))
}

/// Changes a member's role
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/account/members/:user_id
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// { "role": "support" }
/// ```
///
/// # Errors
///
/// - 403 unless the caller owns the account
/// - 400 for an unknown role, the caller's own membership, or another owner
/// - 404 if the user is not a member
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResolvedContext>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateMemberRoleRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let tenant = ctx.tenant()?;

    req.validate()?;

    let target = find_member(&state, tenant.account_id, user_id).await?;
    let role = check_role_change(ctx.user_id(), &target, &req.role)?;

    // The store refuses owner rows, so a promotion since the check above
    // surfaces here as no row
    let Some(updated) = state
        .accounts
        .update_member_role(tenant.account_id, user_id, role)
        .await?
    else {
        let current = find_member(&state, tenant.account_id, user_id).await?;
        check_role_change(ctx.user_id(), &current, &req.role)?;
        return Err(ApiError::NotFound("Member not found".to_string()));
    };

    info!(
        account_id = %tenant.account_id,
        actor_id = %ctx.user_id(),
        target_id = %user_id,
        role = %role,
        "Member role changed"
    );

    Ok(Json(updated.into()))
}

/// Removes a member from the account
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/account/members/:user_id
/// Authorization: Bearer <token>
/// ```
///
/// # Errors
///
/// - 403 unless the caller owns the account
/// - 400 for the caller's own membership or another owner
/// - 404 if the user is not a member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResolvedContext>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<RemoveMemberResponse>> {
    let tenant = ctx.tenant()?;

    let target = find_member(&state, tenant.account_id, user_id).await?;
    check_member_removal(ctx.user_id(), &target)?;

    let removed = state.accounts.remove_member(tenant.account_id, user_id).await?;
    if !removed {
        let current = find_member(&state, tenant.account_id, user_id).await?;
        check_member_removal(ctx.user_id(), &current)?;
        return Err(ApiError::NotFound("Member not found".to_string()));
    }

    info!(
        account_id = %tenant.account_id,
        actor_id = %ctx.user_id(),
        target_id = %user_id,
        "Member removed"
    );

    Ok(Json(RemoveMemberResponse { removed }))
}

async fn find_member(state: &AppState, account_id: Uuid, user_id: Uuid) -> ApiResult<Membership> {
    state
        .accounts
        .find_membership(user_id, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))
}
