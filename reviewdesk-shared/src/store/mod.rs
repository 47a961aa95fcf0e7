/// Privileged data access used by the authorization layer
///
/// These traits are the seams between the resolver and its collaborators.
/// Implementations read the authoritative store directly and bypass
/// per-tenant isolation; callers are responsible for only handing out what
/// the resolver has authorized.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: production store over `sqlx::PgPool`
/// - [`memory::InMemoryStore`]: process-local store for tests and local runs
///
/// Nothing in this module caches. Every call is a fresh read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    account::Account,
    audit::NewAuditEvent,
    membership::{Membership, MembershipRole},
};

pub mod memory;
pub mod postgres;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store could not be reached or refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Account and membership rows
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Reads the membership for `(user_id, account_id)`
    async fn find_membership(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Membership>, StoreError>;

    /// Reads an account row by ID
    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Lists the members of an account
    async fn list_members(&self, account_id: Uuid) -> Result<Vec<Membership>, StoreError>;

    /// Changes a member's role
    ///
    /// Owner rows are left untouched. Returns `None` if the user is not a
    /// member or is an owner.
    async fn update_member_role(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Membership>, StoreError>;

    /// Removes a member
    ///
    /// Owner rows are never removed. Returns false if the user is not a
    /// member or is an owner.
    async fn remove_member(&self, account_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Connectivity check
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// The account a user lands on when the request names none
#[async_trait]
pub trait DefaultAccountLookup: Send + Sync {
    async fn default_account_for(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError>;
}

/// Platform admin flags
#[async_trait]
pub trait AdminLookup: Send + Sync {
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Append-only audit trail
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends one event
    async fn record(&self, event: NewAuditEvent) -> Result<(), StoreError>;

    /// Deletes events older than `cutoff`, returning how many were removed
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
