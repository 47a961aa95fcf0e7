/// Tenant context resolution
///
/// Determines the single account a request acts on. The account id always
/// comes from the `X-Selected-Account` hint or the default-account lookup,
/// never from the user id.
///
/// # Resolution Chain
///
/// 1. **Hint + membership**: the user belongs to the hinted account.
/// 2. **Hint + creator grace**: no membership yet, but the user created the
///    hinted account within the grace window. Covers the gap between account
///    creation and the owner membership row being written.
/// 3. **Hint rejected**: anything else. The request is denied and does NOT
///    fall through to automatic selection.
/// 4. **No hint**: the user's default account.
/// 5. **Nothing**: denied.
///
/// Resolution only picks the account. The membership check that follows is
/// mandatory whichever step succeeded.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::AuthFailure;
use super::identity::User;
use crate::store::{AccountStore, DefaultAccountLookup};

/// Header carrying the account the client has selected
pub const SELECTED_ACCOUNT_HEADER: &str = "x-selected-account";

/// Default creator grace window in seconds
pub const DEFAULT_GRACE_PERIOD_SECS: i64 = 600;

/// How long after creation a creator may act on an account without a membership row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GracePeriod {
    /// Creators get no fallback
    Disabled,

    /// Creators fall back while the account is younger than this
    Within(Duration),

    /// Creators always fall back
    Unbounded,
}

impl Default for GracePeriod {
    fn default() -> Self {
        GracePeriod::Within(Duration::seconds(DEFAULT_GRACE_PERIOD_SECS))
    }
}

impl GracePeriod {
    /// Parses a configuration value: seconds, `0` to disable, or `unbounded`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("unbounded") {
            return Some(GracePeriod::Unbounded);
        }

        match raw.parse::<i64>().ok()? {
            0 => Some(GracePeriod::Disabled),
            secs if secs > 0 => Some(GracePeriod::Within(Duration::seconds(secs))),
            _ => None,
        }
    }

    /// Whether an account of the given age is still inside the window
    pub fn allows(&self, age: Duration) -> bool {
        match self {
            GracePeriod::Disabled => false,
            GracePeriod::Within(window) => age <= *window,
            GracePeriod::Unbounded => true,
        }
    }
}

/// The tenant hint carried by a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantHint {
    /// No header, or an empty one
    Absent,

    /// A header that is not an account id
    Malformed(String),

    /// A well-formed account id
    Account(Uuid),
}

/// Reads the tenant hint from request headers
pub fn read_hint(headers: &HeaderMap) -> TenantHint {
    let Some(value) = headers.get(SELECTED_ACCOUNT_HEADER) else {
        return TenantHint::Absent;
    };

    let Ok(raw) = value.to_str() else {
        return TenantHint::Malformed("<non-ascii>".to_string());
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return TenantHint::Absent;
    }

    match Uuid::parse_str(raw) {
        Ok(id) => TenantHint::Account(id),
        Err(_) => TenantHint::Malformed(raw.chars().take(64).collect()),
    }
}

/// How the account was picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantSource {
    /// Hinted account, user is a member
    Membership,

    /// Hinted account, user is its recent creator
    CreatorGrace,

    /// No hint, user's default account
    Default,
}

/// Outcome of tenant resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantResolution {
    pub account_id: Uuid,
    pub source: TenantSource,
}

/// Collaborators and settings for tenant resolution
pub struct TenantResolver<'a> {
    pub accounts: &'a dyn AccountStore,
    pub defaults: &'a dyn DefaultAccountLookup,
    pub grace_period: GracePeriod,
}

impl TenantResolver<'_> {
    /// Resolves the account for `user` from the request headers
    ///
    /// # Errors
    ///
    /// - `MembershipDenied` when a hinted account is neither joined nor recently created by the user
    /// - `TenantUnresolved` for a malformed hint or when no default exists
    /// - `Internal` when a lookup fails
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<TenantResolution, AuthFailure> {
        match read_hint(headers) {
            TenantHint::Account(account_id) => self.resolve_hinted(user, account_id, now).await,
            TenantHint::Malformed(raw) => {
                warn!(user_id = %user.id, hint = %raw, "Rejected malformed account hint");
                Err(AuthFailure::TenantUnresolved)
            }
            TenantHint::Absent => self.resolve_default(user).await,
        }
    }

    async fn resolve_hinted(
        &self,
        user: &User,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TenantResolution, AuthFailure> {
        if self.accounts.find_membership(user.id, account_id).await?.is_some() {
            debug!(user_id = %user.id, %account_id, "Account resolved from hint");
            return Ok(TenantResolution {
                account_id,
                source: TenantSource::Membership,
            });
        }

        let account = self.accounts.find_account(account_id).await?;

        match account {
            Some(account) if account.is_created_by(user.id) => {
                let age = account.age_at(now);
                if self.grace_period.allows(age) {
                    debug!(
                        user_id = %user.id,
                        %account_id,
                        age_secs = age.num_seconds(),
                        "Account resolved through creator grace"
                    );
                    return Ok(TenantResolution {
                        account_id,
                        source: TenantSource::CreatorGrace,
                    });
                }

                warn!(
                    user_id = %user.id,
                    %account_id,
                    age_secs = age.num_seconds(),
                    "Rejected account hint: creator grace window elapsed"
                );
            }
            _ => {
                warn!(user_id = %user.id, %account_id, "Rejected account hint: not a member");
            }
        }

        Err(AuthFailure::MembershipDenied { account_id })
    }

    async fn resolve_default(&self, user: &User) -> Result<TenantResolution, AuthFailure> {
        match self.defaults.default_account_for(user.id).await? {
            Some(account_id) => {
                debug!(user_id = %user.id, %account_id, "Account resolved from default");
                Ok(TenantResolution {
                    account_id,
                    source: TenantSource::Default,
                })
            }
            None => {
                warn!(user_id = %user.id, "No account could be resolved");
                Err(AuthFailure::TenantUnresolved)
            }
        }
    }
}
