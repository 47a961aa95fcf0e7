/// Identity resolution
///
/// Exchanges raw credentials for a verified [`User`]. Verification itself is
/// delegated to an [`IdentityVerifier`] (the identity service); this module
/// owns the precedence between carriers and the reconstruction of the
/// identity record.
///
/// # Reconstruction
///
/// Verifiers return the identity service's user object as loose JSON. It is
/// never forwarded as-is: [`User::from_identity`] copies a fixed allow-list of
/// fields into a typed record and drops everything else. An object without a
/// usable `id` is corrupt, and resolution fails with 401 even though the
/// verifier reported success.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use super::credentials::RawCredential;
use super::error::AuthFailure;

/// Error type for identity verification
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The credential was rejected (bad signature, expired, revoked, unknown)
    #[error("Invalid credential: {0}")]
    Invalid(String),

    /// The identity service could not be consulted
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

/// Verifies a raw credential with the identity service
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns the identity service's user object for a valid credential
    async fn verify(&self, credential: &RawCredential) -> Result<JsonValue, IdentityError>;
}

/// A verified user
///
/// Built only through [`User::from_identity`]. A user id is never an account
/// id: one user may belong to zero, one or many accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID assigned by the identity service
    pub id: Uuid,

    /// Email address, absent for phone or anonymous sign-ins
    pub email: Option<String>,

    /// When the email address was confirmed
    pub email_confirmed_at: Option<DateTime<Utc>>,

    /// Service-controlled metadata
    pub app_metadata: Map<String, JsonValue>,

    /// User-editable metadata
    pub user_metadata: Map<String, JsonValue>,
}

impl User {
    /// Rebuilds a user from an identity object, keeping only known fields
    ///
    /// Returns `None` when `id` is missing, empty or not a UUID.
    ///
    /// # Example
    ///
    /// ```
    /// use reviewdesk_shared::auth::identity::User;
    /// use serde_json::json;
    ///
    /// let user = User::from_identity(&json!({
    ///     "id": "3f1c2a9e-6d1b-4a57-9a43-0a8d2b7c5e11",
    ///     "email": "owner@bakery.example",
    ///     "role": "service_role"
    /// }))
    /// .unwrap();
    /// assert_eq!(user.email.as_deref(), Some("owner@bakery.example"));
    ///
    /// assert!(User::from_identity(&json!({ "email": "ghost@example.com" })).is_none());
    /// ```
    pub fn from_identity(identity: &JsonValue) -> Option<Self> {
        let id = identity
            .get("id")
            .and_then(JsonValue::as_str)
            .and_then(|s| Uuid::parse_str(s.trim()).ok())?;

        let email = identity
            .get("email")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let email_confirmed_at = identity
            .get("email_confirmed_at")
            .and_then(JsonValue::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(Self {
            id,
            email,
            email_confirmed_at,
            app_metadata: object_field(identity, "app_metadata"),
            user_metadata: object_field(identity, "user_metadata"),
        })
    }

    /// Whether the email address has been confirmed
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

fn object_field(identity: &JsonValue, key: &str) -> Map<String, JsonValue> {
    identity
        .get(key)
        .and_then(JsonValue::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Resolves the caller's identity from the request's credentials
///
/// Credentials are tried in the order given (bearer, then session cookie).
/// A credential the verifier rejects as invalid falls through to the next
/// carrier. Any other outcome ends resolution:
///
/// - a verified identity with a usable id → `Ok(User)`
/// - a verified identity without one → 401
/// - an unreachable identity service → 500, not retried
///
/// # Errors
///
/// `Unauthenticated` when no credential verifies, `Internal` when the
/// identity service is unavailable.
pub async fn resolve_identity(
    verifier: &dyn IdentityVerifier,
    credentials: &[RawCredential],
) -> Result<User, AuthFailure> {
    if credentials.is_empty() {
        return Err(AuthFailure::Unauthenticated("missing credentials".to_string()));
    }

    for credential in credentials {
        match verifier.verify(credential).await {
            Ok(identity) => {
                let Some(user) = User::from_identity(&identity) else {
                    warn!(
                        source = credential.source.as_str(),
                        "Verified identity has no usable id, treating as corrupt"
                    );
                    return Err(AuthFailure::Unauthenticated("corrupt identity".to_string()));
                };

                debug!(user_id = %user.id, source = credential.source.as_str(), "Identity resolved");
                return Ok(user);
            }
            Err(IdentityError::Invalid(reason)) => {
                debug!(source = credential.source.as_str(), %reason, "Credential rejected");
            }
            Err(IdentityError::Unavailable(reason)) => {
                return Err(AuthFailure::Internal(format!(
                    "identity verification failed: {reason}"
                )));
            }
        }
    }

    Err(AuthFailure::Unauthenticated("invalid credentials".to_string()))
}
