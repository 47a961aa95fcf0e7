/// Membership checks and privilege gates
///
/// This module provides the checks that run once a request has a verified
/// user and, for account-scoped requests, a resolved account.
///
/// # Permission Model
///
/// 1. **Account Membership**: the user must hold a membership row for the account
/// 2. **Role Gates**: owner-only operations check the membership role
/// 3. **Platform Admin**: a flag independent of any account
/// 4. **Member Management Safety**: owners cannot act on their own membership
///    and nobody can remove or re-role another owner through the API
///
/// Every check reads the store directly. Nothing is cached, so a removed or
/// demoted user is refused on their very next request.
///
/// # Example
///
/// ```no_run
/// use reviewdesk_shared::auth::authorization::{require_owner, verify_membership};
/// use reviewdesk_shared::auth::error::AuthFailure;
/// use reviewdesk_shared::auth::identity::User;
/// use reviewdesk_shared::store::AccountStore;
/// use uuid::Uuid;
///
/// async fn check_permissions(
///     store: &dyn AccountStore,
///     user: &User,
///     account_id: Uuid,
/// ) -> Result<(), AuthFailure> {
///     let role = verify_membership(store, user, account_id).await?;
///     require_owner(role)?;
///     Ok(())
/// }
/// ```

use tracing::{debug, warn};
use uuid::Uuid;

use super::error::AuthFailure;
use super::identity::User;
use crate::models::membership::{Membership, MembershipRole};
use crate::store::{AccountStore, AdminLookup};

/// Confirms the user is a member of the account and returns their role
///
/// # Errors
///
/// Returns `AuthFailure::MembershipDenied` if there is no membership row,
/// `AuthFailure::Internal` if the lookup fails
pub async fn verify_membership(
    store: &dyn AccountStore,
    user: &User,
    account_id: Uuid,
) -> Result<MembershipRole, AuthFailure> {
    match store.find_membership(user.id, account_id).await? {
        Some(membership) => {
            debug!(user_id = %user.id, %account_id, role = %membership.role, "Membership verified");
            Ok(membership.role)
        }
        None => {
            warn!(user_id = %user.id, %account_id, "No membership for resolved account");
            Err(AuthFailure::MembershipDenied { account_id })
        }
    }
}

/// Whether the user is a platform admin
///
/// # Errors
///
/// Returns `AuthFailure::Internal` if the lookup fails
pub async fn is_admin(admins: &dyn AdminLookup, user: &User) -> Result<bool, AuthFailure> {
    Ok(admins.is_admin(user.id).await?)
}

/// Requires the platform admin flag
pub async fn require_admin(admins: &dyn AdminLookup, user: &User) -> Result<(), AuthFailure> {
    if !is_admin(admins, user).await? {
        warn!(user_id = %user.id, "Admin access denied");
        return Err(AuthFailure::InsufficientRole { required: "admin" });
    }

    Ok(())
}

/// Requires the `owner` role
pub fn require_owner(role: MembershipRole) -> Result<(), AuthFailure> {
    if !role.is_owner() {
        return Err(AuthFailure::InsufficientRole { required: "owner" });
    }

    Ok(())
}

/// Parses a role supplied by a client
///
/// # Errors
///
/// Returns `AuthFailure::MalformedPrivilegedRequest` unless the value is
/// exactly one of `owner`, `member`, `support`
pub fn parse_role(raw: &str) -> Result<MembershipRole, AuthFailure> {
    MembershipRole::from_str(raw).ok_or_else(|| {
        let accepted: Vec<&str> = MembershipRole::ALL.iter().map(|r| r.as_str()).collect();
        AuthFailure::MalformedPrivilegedRequest(format!(
            "Invalid role. Must be one of: {}",
            accepted.join(", ")
        ))
    })
}

/// Checks that `actor_id` may remove `target`
///
/// Assumes the actor already passed [`require_owner`].
///
/// # Errors
///
/// Returns `AuthFailure::MalformedPrivilegedRequest` when the actor targets
/// their own membership or another owner's
pub fn check_member_removal(actor_id: Uuid, target: &Membership) -> Result<(), AuthFailure> {
    if target.user_id == actor_id {
        return Err(AuthFailure::MalformedPrivilegedRequest(
            "You cannot remove yourself from the account".to_string(),
        ));
    }

    if target.role.is_owner() {
        return Err(AuthFailure::MalformedPrivilegedRequest(
            "Account owners cannot be removed".to_string(),
        ));
    }

    Ok(())
}

/// Checks that `actor_id` may give `target` the role `raw_role`
///
/// Assumes the actor already passed [`require_owner`]. Returns the parsed role.
///
/// # Errors
///
/// Returns `AuthFailure::MalformedPrivilegedRequest` for an unknown role, a
/// change to the actor's own membership, or a change to another owner
pub fn check_role_change(
    actor_id: Uuid,
    target: &Membership,
    raw_role: &str,
) -> Result<MembershipRole, AuthFailure> {
    let role = parse_role(raw_role)?;

    if target.user_id == actor_id {
        return Err(AuthFailure::MalformedPrivilegedRequest(
            "You cannot change your own role".to_string(),
        ));
    }

    if target.role.is_owner() {
        return Err(AuthFailure::MalformedPrivilegedRequest(
            "Account owners cannot be modified".to_string(),
        ));
    }

    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountPlan;
    use crate::store::memory::InMemoryStore;
    use axum::http::StatusCode;
    use chrono::Utc;
    use serde_json::Map;

    fn user(id: Uuid) -> User {
        User {
            id,
            email: None,
            email_confirmed_at: None,
            app_metadata: Map::new(),
            user_metadata: Map::new(),
        }
    }

    fn membership(user_id: Uuid, role: MembershipRole) -> Membership {
        Membership {
            account_id: Uuid::new_v4(),
            user_id,
            role,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_verify_membership() {
        let store = InMemoryStore::new();
        let member = user(Uuid::new_v4());
        let account = store
            .insert_account("Bakery", AccountPlan::Pro, None, Utc::now())
            .await;
        store
            .insert_membership(account.id, member.id, MembershipRole::Support)
            .await;

        let role = verify_membership(&store, &member, account.id).await.unwrap();
        assert_eq!(role, MembershipRole::Support);

        let stranger = user(Uuid::new_v4());
        let err = verify_membership(&store, &stranger, account.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_removed_member_denied_on_next_check() {
        let store = InMemoryStore::new();
        let member = user(Uuid::new_v4());
        let account = store
            .insert_account("Bakery", AccountPlan::Pro, None, Utc::now())
            .await;
        store
            .insert_membership(account.id, member.id, MembershipRole::Member)
            .await;

        assert!(verify_membership(&store, &member, account.id).await.is_ok());
        store.remove_member(account.id, member.id).await.unwrap();
        assert!(verify_membership(&store, &member, account.id).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_is_account_independent() {
        let store = InMemoryStore::new();
        let admin = user(Uuid::new_v4());
        store.insert_admin(admin.id).await;

        assert!(is_admin(&store, &admin).await.unwrap());
        assert!(require_admin(&store, &admin).await.is_ok());

        let err = require_admin(&store, &user(Uuid::new_v4())).await.unwrap_err();
        assert_eq!(err, AuthFailure::InsufficientRole { required: "admin" });
    }

    #[test]
    fn test_require_owner() {
        assert!(require_owner(MembershipRole::Owner).is_ok());
        assert!(require_owner(MembershipRole::Member).is_err());
        assert!(require_owner(MembershipRole::Support).is_err());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("support").unwrap(), MembershipRole::Support);

        for bad in ["admin", "Owner", "", " member"] {
            let err = parse_role(bad).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_member_removal_rules() {
        let actor = Uuid::new_v4();

        let own = membership(actor, MembershipRole::Owner);
        assert!(check_member_removal(actor, &own).is_err());

        let other_owner = membership(Uuid::new_v4(), MembershipRole::Owner);
        assert!(check_member_removal(actor, &other_owner).is_err());

        let member = membership(Uuid::new_v4(), MembershipRole::Member);
        assert!(check_member_removal(actor, &member).is_ok());
    }

    #[test]
    fn test_role_change_rules() {
        let actor = Uuid::new_v4();

        let own = membership(actor, MembershipRole::Owner);
        let err = check_role_change(actor, &own, "member").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let other_owner = membership(Uuid::new_v4(), MembershipRole::Owner);
        assert!(check_role_change(actor, &other_owner, "member").is_err());

        let member = membership(Uuid::new_v4(), MembershipRole::Member);
        assert!(check_role_change(actor, &member, "superuser").is_err());
        assert_eq!(
            check_role_change(actor, &member, "support").unwrap(),
            MembershipRole::Support
        );
    }
}
