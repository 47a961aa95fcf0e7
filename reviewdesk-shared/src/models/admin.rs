/// Platform administrators
///
/// Admin status is a property of the user, not of any account membership.
///
/// ```sql
/// CREATE TABLE admin_users (
///     user_id UUID PRIMARY KEY,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use sqlx::PgPool;
use uuid::Uuid;

/// Lookup for the `admin_users` table
pub struct AdminUser;

impl AdminUser {
    /// Checks whether a user is flagged as a platform admin
    pub async fn exists(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM admin_users WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
