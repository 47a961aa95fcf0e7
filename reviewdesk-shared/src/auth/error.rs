/// Authorization failure taxonomy
///
/// Every stage of the resolver returns one of these instead of panicking or
/// leaking a lower-level error. The API layer maps them onto HTTP responses in
/// a single place.
///
/// | Variant | Status |
/// |---|---|
/// | `Unauthenticated` | 401 |
/// | `TenantUnresolved`, `MembershipDenied`, `InsufficientRole` | 403 |
/// | `MalformedPrivilegedRequest` | 400 |
/// | `Internal` | 500 |
///
/// The three 403 variants share one public message so a caller cannot tell a
/// nonexistent account from one they are not allowed into.

use axum::http::StatusCode;
use uuid::Uuid;

use crate::store::StoreError;

/// Message returned for every 403
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";

/// Error type for the authorization pipeline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// No credential, an invalid credential, or a corrupt identity
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// No account could be resolved for the request
    #[error("No account could be resolved")]
    TenantUnresolved,

    /// The user has no membership in the resolved account
    #[error("Not a member of account {account_id}")]
    MembershipDenied { account_id: Uuid },

    /// The user lacks the role or flag the operation needs
    #[error("Insufficient privileges: requires {required}")]
    InsufficientRole { required: &'static str },

    /// A privileged request that can never be valid (bad role, self-target, owner-target)
    #[error("{0}")]
    MalformedPrivilegedRequest(String),

    /// Unexpected failure anywhere in the chain
    #[error("Internal authorization error: {0}")]
    Internal(String),
}

impl AuthFailure {
    /// HTTP status for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthFailure::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthFailure::TenantUnresolved
            | AuthFailure::MembershipDenied { .. }
            | AuthFailure::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            AuthFailure::MalformedPrivilegedRequest(_) => StatusCode::BAD_REQUEST,
            AuthFailure::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            AuthFailure::Unauthenticated(_) => "Authentication required".to_string(),
            AuthFailure::TenantUnresolved
            | AuthFailure::MembershipDenied { .. }
            | AuthFailure::InsufficientRole { .. } => ACCESS_DENIED_MESSAGE.to_string(),
            AuthFailure::MalformedPrivilegedRequest(msg) => msg.clone(),
            AuthFailure::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    /// Short machine-readable reason for logs and audit details
    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::Unauthenticated(_) => "unauthenticated",
            AuthFailure::TenantUnresolved => "tenant_unresolved",
            AuthFailure::MembershipDenied { .. } => "membership_denied",
            AuthFailure::InsufficientRole { .. } => "insufficient_role",
            AuthFailure::MalformedPrivilegedRequest(_) => "malformed_request",
            AuthFailure::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for AuthFailure {
    fn from(err: StoreError) -> Self {
        AuthFailure::Internal(err.to_string())
    }
}
