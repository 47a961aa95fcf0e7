/// In-memory store
///
/// Implements every store trait over process-local maps. Used by the test
/// suites and for running the API without a database. Reads are counted so
/// tests can assert that a code path performed no lookups at all.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, AdminLookup, AuditStore, DefaultAccountLookup, StoreError};
use crate::models::{
    account::{Account, AccountPlan},
    audit::{AuditEvent, NewAuditEvent},
    membership::{Membership, MembershipRole},
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    memberships: HashMap<(Uuid, Uuid), Membership>,
    admins: HashSet<Uuid>,
    audit: Vec<AuditEvent>,
}

/// Store holding all rows in memory
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    reads: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account created by `created_by` at `created_at`
    pub async fn insert_account(
        &self,
        name: &str,
        plan: AccountPlan,
        created_by: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            name: name.to_string(),
            plan: plan.as_str().to_string(),
            user_limit: 5,
            created_by,
            created_at,
            updated_at: created_at,
        };

        self.tables
            .write()
            .await
            .accounts
            .insert(account.id, account.clone());

        account
    }

    /// Inserts or replaces a membership
    pub async fn insert_membership(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Membership {
        let membership = Membership {
            account_id,
            user_id,
            role,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .await
            .memberships
            .insert((account_id, user_id), membership.clone());

        membership
    }

    /// Flags a user as platform admin
    pub async fn insert_admin(&self, user_id: Uuid) {
        self.tables.write().await.admins.insert(user_id);
    }

    /// Snapshot of recorded audit events, oldest first
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.tables.read().await.audit.clone()
    }

    /// Number of account/membership/admin/default reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn count_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_membership(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        self.count_read();
        let tables = self.tables.read().await;
        Ok(tables.memberships.get(&(account_id, user_id)).cloned())
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        self.count_read();
        Ok(self.tables.read().await.accounts.get(&account_id).cloned())
    }

    async fn list_members(&self, account_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        self.count_read();
        let tables = self.tables.read().await;
        let mut members: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.created_at);
        Ok(members)
    }

    async fn update_member_role(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Membership>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .memberships
            .get_mut(&(account_id, user_id))
            .filter(|m| !m.role.is_owner())
            .map(|m| {
                m.role = role;
                m.clone()
            }))
    }

    async fn remove_member(&self, account_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (account_id, user_id);
        match tables.memberships.get(&key) {
            Some(m) if !m.role.is_owner() => Ok(tables.memberships.remove(&key).is_some()),
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl DefaultAccountLookup for InMemoryStore {
    async fn default_account_for(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        self.count_read();
        let tables = self.tables.read().await;

        Ok(tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .min_by_key(|m| (!m.role.is_owner(), m.created_at))
            .map(|m| m.account_id))
    }
}

#[async_trait]
impl AdminLookup for InMemoryStore {
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.count_read();
        Ok(self.tables.read().await.admins.contains(&user_id))
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn record(&self, event: NewAuditEvent) -> Result<(), StoreError> {
        let row = AuditEvent {
            id: Uuid::new_v4(),
            actor_id: event.actor_id,
            event_type: event.event_type.as_str().to_string(),
            severity: event.severity.as_str().to_string(),
            details: event.details,
            created_at: Utc::now(),
        };
        self.tables.write().await.audit.push(row);
        Ok(())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.audit.len();
        tables.audit.retain(|e| e.created_at >= cutoff);
        Ok((before - tables.audit.len()) as u64)
    }
}
