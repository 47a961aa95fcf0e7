/// Membership model and database operations
///
/// A membership links a user to an account with exactly one role. There is at
/// most one row per (account, user) pair, enforced by the primary key.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_role AS ENUM ('owner', 'member', 'support');
///
/// CREATE TABLE account_users (
///     account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL,
///     role membership_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (account_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: billing, member management, every account mutation
/// - **member**: day-to-day campaign and review work
/// - **support**: staff granted access to help an account
///
/// All reads here go straight to the database. Role data is never cached so a
/// demoted or removed user loses access on their very next request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Roles a user can hold within an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// Full control of the account
    Owner,

    /// Regular team member
    Member,

    /// Support staff acting on the account's behalf
    Support,
}

impl MembershipRole {
    /// All accepted role values, in display order
    pub const ALL: [MembershipRole; 3] = [
        MembershipRole::Owner,
        MembershipRole::Member,
        MembershipRole::Support,
    ];

    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "owner",
            MembershipRole::Member => "member",
            MembershipRole::Support => "support",
        }
    }

    /// Parses a role from its stored string form
    ///
    /// Only the exact lowercase values are accepted.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(MembershipRole::Owner),
            "member" => Some(MembershipRole::Member),
            "support" => Some(MembershipRole::Support),
            _ => None,
        }
    }

    /// Whether this role is `owner`
    pub fn is_owner(&self) -> bool {
        matches!(self, MembershipRole::Owner)
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership row linking a user to an account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Account ID
    pub account_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the account
    pub role: MembershipRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Finds the membership for a user in an account
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use reviewdesk_shared::models::membership::Membership;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, account_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    /// if let Some(membership) = Membership::find(&pool, account_id, user_id).await? {
    ///     println!("Role: {}", membership.role);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find(
        pool: &PgPool,
        account_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT account_id, user_id, role, created_at
            FROM account_users
            WHERE account_id = $1 AND user_id = $2
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Changes a non-owner member's role
    ///
    /// Returns the updated membership, or `None` if the user is not a member
    /// or is an owner.
    pub async fn update_role(
        pool: &PgPool,
        account_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE account_users
            SET role = $3
            WHERE account_id = $1 AND user_id = $2 AND role <> 'owner'
            RETURNING account_id, user_id, role, created_at
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Removes a non-owner member from an account
    ///
    /// Returns true if a row was deleted. Owner rows are never deleted.
    pub async fn delete(pool: &PgPool, account_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM account_users WHERE account_id = $1 AND user_id = $2 AND role <> 'owner'",
        )
            .bind(account_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all members of an account, oldest first
    pub async fn list_by_account(pool: &PgPool, account_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT account_id, user_id, role, created_at
            FROM account_users
            WHERE account_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// Picks the account a user lands on when no account was selected
    ///
    /// Owned accounts win over other memberships; ties go to the oldest
    /// membership.
    pub async fn default_account_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let account_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT account_id FROM account_users
            WHERE user_id = $1
            ORDER BY (role = 'owner') DESC, created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_role_as_str() {
        assert_eq!(MembershipRole::Owner.as_str(), "owner");
        assert_eq!(MembershipRole::Member.as_str(), "member");
        assert_eq!(MembershipRole::Support.as_str(), "support");
    }

    #[test]
    fn test_membership_role_from_str() {
        for role in MembershipRole::ALL {
            assert_eq!(MembershipRole::from_str(role.as_str()), Some(role));
        }

        assert_eq!(MembershipRole::from_str("admin"), None);
        assert_eq!(MembershipRole::from_str("Owner"), None);
        assert_eq!(MembershipRole::from_str(""), None);
    }

    #[test]
    fn test_only_owner_is_owner() {
        assert!(MembershipRole::Owner.is_owner());
        assert!(!MembershipRole::Member.is_owner());
        assert!(!MembershipRole::Support.is_owner());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&MembershipRole::Support).unwrap();
        assert_eq!(json, "\"support\"");

        let role: MembershipRole = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(role, MembershipRole::Owner);
    }
}
