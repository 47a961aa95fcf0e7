/// Account model and database operations
///
/// An account is the tenant: the billing and data-isolation boundary. Every
/// campaign, review and page in the product is scoped to exactly one account.
/// Users reach an account only through a [`Membership`](super::membership::Membership).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     plan VARCHAR(50) NOT NULL DEFAULT 'free',
///     user_limit INTEGER NOT NULL DEFAULT 1,
///     created_by UUID,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Accounts are created and deleted by account-management flows elsewhere;
/// the authorization layer only reads them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Plan tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountPlan {
    /// Free tier, single seat
    Free,

    /// Starter tier
    Starter,

    /// Professional tier
    Pro,

    /// Agency tier (many client accounts)
    Agency,
}

impl AccountPlan {
    /// Converts plan to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountPlan::Free => "free",
            AccountPlan::Starter => "starter",
            AccountPlan::Pro => "pro",
            AccountPlan::Agency => "agency",
        }
    }
}

/// Account row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Plan tier as stored
    pub plan: String,

    /// Maximum number of members the plan allows
    pub user_limit: i32,

    /// User who created the account
    ///
    /// Used only by the creator grace fallback while the creator's membership
    /// row may still be replicating.
    pub created_by: Option<Uuid>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether `user_id` is the recorded creator of this account
    pub fn is_created_by(&self, user_id: Uuid) -> bool {
        self.created_by == Some(user_id)
    }

    /// Age of the account at `now` (zero if the clock is behind)
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).max(Duration::zero())
    }

    /// Finds an account by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use reviewdesk_shared::models::account::Account;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, account_id: Uuid) -> Result<(), sqlx::Error> {
    /// if let Some(account) = Account::find_by_id(&pool, account_id).await? {
    ///     println!("Found account: {}", account.name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, plan, user_limit, created_by, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(account)
    }
}
