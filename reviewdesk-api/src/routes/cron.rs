/// Scheduled maintenance endpoints
///
/// Called by the job scheduler with `Authorization: Bearer <CRON_SECRET_TOKEN>`.
/// No user is involved.
///
/// # Endpoints
///
/// - `POST /v1/cron/audit-retention` - Delete audit events past retention

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

/// Retention run result
#[derive(Debug, Serialize)]
pub struct PruneResponse {
    /// Events deleted
    pub pruned: u64,

    /// Events older than this were deleted
    pub cutoff: DateTime<Utc>,
}

/// Deletes audit events older than the configured retention
pub async fn prune_audit_logs(State(state): State<AppState>) -> ApiResult<Json<PruneResponse>> {
    let cutoff = Utc::now() - Duration::days(state.config.audit.retention_days);

    let pruned = state.audit.prune_before(cutoff).await?;

    info!(pruned, %cutoff, "Audit retention run complete");

    Ok(Json(PruneResponse { pruned, cutoff }))
}
