/// Local verification of identity-service access tokens
///
/// The identity service signs its access tokens with HS256 using a secret the
/// API shares. Verifying them locally avoids a network round-trip per request
/// while keeping the same outcome as asking the service.
///
/// # Security
///
/// - **Algorithm**: HS256 only, any other `alg` header is rejected
/// - **Validation**: signature, expiration and audience
/// - **Secret Management**: secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use reviewdesk_shared::auth::jwt::{create_identity_token, IdentityClaims, JwtIdentityVerifier};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let claims = IdentityClaims::for_user(Uuid::new_v4(), "owner@bakery.example");
/// let token = create_identity_token(&claims, secret)?;
///
/// let verifier = JwtIdentityVerifier::new(secret);
/// let decoded = verifier.decode(&token)?;
/// assert_eq!(decoded.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

use super::credentials::RawCredential;
use super::identity::{IdentityError, IdentityVerifier};

/// Audience the identity service stamps on user access tokens
pub const DEFAULT_AUDIENCE: &str = "authenticated";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued for another audience
    #[error("Invalid audience")]
    InvalidAudience,

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),
}

/// Claims carried by an identity-service access token
///
/// `sub` is optional on purpose: a token that verifies but carries no subject
/// is reported upward as an identity without an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject - user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// RFC 3339 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_confirmed_at: Option<String>,

    /// Postgres role the identity service would use (`authenticated`, `service_role`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub app_metadata: Map<String, JsonValue>,

    #[serde(default)]
    pub user_metadata: Map<String, JsonValue>,
}

impl IdentityClaims {
    /// Claims for a confirmed user, valid for one hour
    pub fn for_user(user_id: Uuid, email: &str) -> Self {
        let now = Utc::now();
        Self {
            sub: Some(user_id.to_string()),
            aud: DEFAULT_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            email: Some(email.to_string()),
            email_confirmed_at: Some(now.to_rfc3339()),
            role: Some("authenticated".to_string()),
            app_metadata: Map::new(),
            user_metadata: Map::new(),
        }
    }

    /// Same claims with a custom lifetime relative to now
    pub fn expiring_in(mut self, lifetime: Duration) -> Self {
        self.exp = (Utc::now() + lifetime).timestamp();
        self
    }

    /// Identity object in the shape the identity service returns for a user
    pub fn to_identity(&self) -> JsonValue {
        let mut identity = json!({
            "email": self.email,
            "email_confirmed_at": self.email_confirmed_at,
            "role": self.role,
            "aud": self.aud,
            "app_metadata": self.app_metadata,
            "user_metadata": self.user_metadata,
        });

        if let Some(sub) = &self.sub {
            identity["id"] = JsonValue::String(sub.clone());
        }

        identity
    }
}

/// Signs identity claims with HS256
///
/// Used by local development tooling and tests to mint tokens the way the
/// identity service does.
///
/// # Errors
///
/// Returns error if encoding fails
pub fn create_identity_token(claims: &IdentityClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Identity verifier checking HS256 tokens against the shared secret
pub struct JwtIdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    /// Verifier expecting the default audience
    pub fn new(secret: &str) -> Self {
        Self::with_audience(secret, DEFAULT_AUDIENCE)
    }

    /// Verifier expecting a custom audience
    pub fn with_audience(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.validate_exp = true;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token
    ///
    /// # Errors
    ///
    /// Returns error if the signature, expiration or audience is invalid
    pub fn decode(&self, token: &str) -> Result<IdentityClaims, JwtError> {
        let data = decode::<IdentityClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                ErrorKind::InvalidAudience => JwtError::InvalidAudience,
                _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(data.claims)
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, credential: &RawCredential) -> Result<JsonValue, IdentityError> {
        self.decode(&credential.value)
            .map(|claims| claims.to_identity())
            .map_err(|e| IdentityError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::CredentialSource;
    use crate::auth::identity::User;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn bearer(token: String) -> RawCredential {
        RawCredential {
            source: CredentialSource::Bearer,
            value: token,
        }
    }

    #[test]
    fn test_create_and_decode() {
        let user_id = Uuid::new_v4();
        let claims = IdentityClaims::for_user(user_id, "owner@bakery.example");
        let token = create_identity_token(&claims, SECRET).unwrap();

        let decoded = JwtIdentityVerifier::new(SECRET).decode(&token).unwrap();
        assert_eq!(decoded.sub, Some(user_id.to_string()));
        assert_eq!(decoded.email.as_deref(), Some("owner@bakery.example"));
    }

    #[test]
    fn test_wrong_secret() {
        let claims = IdentityClaims::for_user(Uuid::new_v4(), "a@example.com");
        let token = create_identity_token(&claims, SECRET).unwrap();

        let result = JwtIdentityVerifier::new("another-secret-key-also-32-bytes-long").decode(&token);
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_expired_token() {
        let claims =
            IdentityClaims::for_user(Uuid::new_v4(), "a@example.com").expiring_in(Duration::hours(-2));
        let token = create_identity_token(&claims, SECRET).unwrap();

        let result = JwtIdentityVerifier::new(SECRET).decode(&token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_audience() {
        let mut claims = IdentityClaims::for_user(Uuid::new_v4(), "a@example.com");
        claims.aud = "anon".to_string();
        let token = create_identity_token(&claims, SECRET).unwrap();

        let result = JwtIdentityVerifier::new(SECRET).decode(&token);
        assert!(matches!(result, Err(JwtError::InvalidAudience)));
    }

    #[test]
    fn test_malformed_token() {
        let result = JwtIdentityVerifier::new(SECRET).decode("not-a-jwt");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_verify_produces_identity_object() {
        let user_id = Uuid::new_v4();
        let mut claims = IdentityClaims::for_user(user_id, "owner@bakery.example");
        claims
            .user_metadata
            .insert("full_name".into(), JsonValue::String("Sam Baker".into()));
        let token = create_identity_token(&claims, SECRET).unwrap();

        let identity = JwtIdentityVerifier::new(SECRET)
            .verify(&bearer(token))
            .await
            .unwrap();

        let user = User::from_identity(&identity).unwrap();
        assert_eq!(user.id, user_id);
        assert!(user.is_confirmed());
        assert_eq!(user.user_metadata["full_name"], "Sam Baker");
    }

    #[tokio::test]
    async fn test_verify_subjectless_token_has_no_id() {
        let mut claims = IdentityClaims::for_user(Uuid::new_v4(), "ghost@example.com");
        claims.sub = None;
        let token = create_identity_token(&claims, SECRET).unwrap();

        let identity = JwtIdentityVerifier::new(SECRET)
            .verify(&bearer(token))
            .await
            .unwrap();
        assert!(identity.get("id").is_none());
        assert!(User::from_identity(&identity).is_none());
    }

    #[tokio::test]
    async fn test_verify_invalid_token() {
        let result = JwtIdentityVerifier::new(SECRET)
            .verify(&bearer("garbage".to_string()))
            .await;
        assert!(matches!(result, Err(IdentityError::Invalid(_))));
    }
}
