/// Current user endpoint
///
/// ```text
/// GET /v1/me
/// Authorization: Bearer <token>
/// ```
///
/// Returns the verified identity record. No account is resolved for this
/// route, so it answers for users without any membership too.

use crate::error::ApiResult;
use axum::{Extension, Json};
use reviewdesk_shared::auth::{identity::User, resolver::ResolvedContext};

pub async fn current_user(Extension(ctx): Extension<ResolvedContext>) -> ApiResult<Json<User>> {
    Ok(Json(ctx.user))
}
