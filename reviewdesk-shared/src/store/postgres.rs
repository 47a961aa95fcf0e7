/// PostgreSQL implementation of the store traits
///
/// Thin delegation to the model query functions. The pool connects with the
/// service role, so row-level tenant policies do not apply here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, AdminLookup, AuditStore, DefaultAccountLookup, StoreError};
use crate::db::pool::health_check;
use crate::models::{
    account::Account,
    admin::AdminUser,
    audit::{AuditEvent, NewAuditEvent},
    membership::{Membership, MembershipRole},
};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_membership(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(Membership::find(&self.pool, account_id, user_id).await?)
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(Account::find_by_id(&self.pool, account_id).await?)
    }

    async fn list_members(&self, account_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        Ok(Membership::list_by_account(&self.pool, account_id).await?)
    }

    async fn update_member_role(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(Membership::update_role(&self.pool, account_id, user_id, role).await?)
    }

    async fn remove_member(&self, account_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(Membership::delete(&self.pool, account_id, user_id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }
}

#[async_trait]
impl DefaultAccountLookup for PgStore {
    async fn default_account_for(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(Membership::default_account_for_user(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl AdminLookup for PgStore {
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(AdminUser::exists(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn record(&self, event: NewAuditEvent) -> Result<(), StoreError> {
        AuditEvent::insert(&self.pool, event).await?;
        Ok(())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(AuditEvent::prune_before(&self.pool, cutoff).await?)
    }
}
