/// Audit log model
///
/// Security events written by the authorization layer. Rows are append-only:
/// they are inserted once and never updated. The only delete is retention
/// pruning of rows past the configured age.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE audit_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     actor_id UUID,
///     event_type VARCHAR(64) NOT NULL,
///     severity VARCHAR(16) NOT NULL DEFAULT 'info',
///     details JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Kinds of audit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Unauthenticated or unauthorized attempt
    AuthFailure,

    /// Successful privileged access
    ApiAccess,
}

impl AuditEventType {
    /// Stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::AuthFailure => "auth_failure",
            AuditEventType::ApiAccess => "api_access",
        }
    }
}

/// Severity attached to an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
}

impl AuditSeverity {
    /// Stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSeverity::Info => "info",
            AuditSeverity::Warning => "warning",
            AuditSeverity::Error => "error",
        }
    }
}

/// A stored audit event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEvent {
    /// Event ID
    pub id: Uuid,

    /// Acting user, `None` for failures before identity was established
    pub actor_id: Option<Uuid>,

    /// Event type (`auth_failure`, `api_access`)
    pub event_type: String,

    /// Severity (`info`, `warning`, `error`)
    pub severity: String,

    /// Free-form details (endpoint, account id, network metadata, reason)
    pub details: JsonValue,

    /// When the event was recorded
    pub created_at: DateTime<Utc>,
}

/// Input for recording an audit event
#[derive(Debug, Clone, Serialize)]
pub struct NewAuditEvent {
    pub actor_id: Option<Uuid>,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub details: JsonValue,
}

impl AuditEvent {
    /// Inserts an audit event
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn insert(pool: &PgPool, event: NewAuditEvent) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, AuditEvent>(
            r#"
            INSERT INTO audit_logs (actor_id, event_type, severity, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id, actor_id, event_type, severity, details, created_at
            "#,
        )
        .bind(event.actor_id)
        .bind(event.event_type.as_str())
        .bind(event.severity.as_str())
        .bind(event.details)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    /// Deletes events recorded before `cutoff`
    ///
    /// Returns the number of rows removed.
    pub async fn prune_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
