/// Side-channel authorizers
///
/// Scheduled jobs and third-party webhooks do not carry user credentials.
/// They bypass identity, tenant and membership resolution entirely and are
/// authorized here instead:
///
/// - **Cron**: `Authorization: Bearer <secret>` matched in constant time
///   against a secret fixed at startup. No secret configured means every
///   call is refused.
/// - **Webhook**: the raw body and the provider's signature header are handed
///   to a [`WebhookSignatureVerifier`]. A missing body or signature is never
///   verified.

use std::sync::Arc;

use axum::http::HeaderMap;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use super::credentials::bearer_token;
use super::error::AuthFailure;

/// Default webhook signature header
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Authorizes scheduled-job callers by shared secret
#[derive(Clone)]
pub struct CronAuthorizer {
    secret: Option<Arc<str>>,
}

impl CronAuthorizer {
    /// Creates an authorizer; an empty secret counts as unconfigured
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.trim().is_empty())
                .map(|s| Arc::from(s.as_str())),
        }
    }

    /// Whether a secret is configured
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks the request's bearer token against the secret
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure::Unauthenticated` when no secret is configured,
    /// the token is missing, or it does not match
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthFailure> {
        let Some(secret) = &self.secret else {
            error!("Cron request refused: CRON_SECRET_TOKEN is not configured");
            return Err(AuthFailure::Unauthenticated("cron secret not configured".to_string()));
        };

        let Some(presented) = bearer_token(headers) else {
            warn!("Cron request without bearer token");
            return Err(AuthFailure::Unauthenticated("missing cron token".to_string()));
        };

        if !constant_time_eq(presented.as_bytes(), secret.as_bytes()) {
            warn!("Cron request with invalid token");
            return Err(AuthFailure::Unauthenticated("invalid cron token".to_string()));
        }

        debug!("Cron request authorized");
        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Checks a webhook signature against its payload
pub trait WebhookSignatureVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature: &str) -> bool;
}

/// HMAC-SHA256 signature verifier
///
/// Accepts a lowercase or uppercase hex digest, optionally prefixed with
/// `sha256=`.
pub struct HmacSha256Verifier {
    secret: Vec<u8>,
}

impl HmacSha256Verifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex signature for a payload
    pub fn sign(&self, payload: &[u8]) -> Option<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret).ok()?;
        mac.update(payload);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

impl WebhookSignatureVerifier for HmacSha256Verifier {
    fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let signature = signature.trim();
        let digest = signature.strip_prefix("sha256=").unwrap_or(signature);

        let Ok(expected) = hex::decode(digest) else {
            return false;
        };

        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

/// Result of the webhook gate
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookVerification {
    pub verified: bool,
    pub payload: Option<Bytes>,
    pub signature: Option<String>,
}

impl WebhookVerification {
    fn rejected(payload: Option<Bytes>, signature: Option<String>) -> Self {
        Self {
            verified: false,
            payload,
            signature,
        }
    }
}

/// Authorizes inbound webhooks by signature
#[derive(Clone)]
pub struct WebhookAuthorizer {
    signature_header: String,
    verifier: Option<Arc<dyn WebhookSignatureVerifier>>,
}

impl WebhookAuthorizer {
    pub fn new(
        signature_header: impl Into<String>,
        verifier: Option<Arc<dyn WebhookSignatureVerifier>>,
    ) -> Self {
        Self {
            signature_header: signature_header.into().to_ascii_lowercase(),
            verifier,
        }
    }

    /// Runs the presence gate, then the signature verifier
    pub fn authorize(&self, headers: &HeaderMap, body: Bytes) -> WebhookVerification {
        let signature = headers
            .get(self.signature_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let payload = (!body.is_empty()).then_some(body);

        let (Some(body), Some(sig)) = (&payload, &signature) else {
            warn!(
                has_body = payload.is_some(),
                has_signature = signature.is_some(),
                "Webhook rejected: body or signature missing"
            );
            return WebhookVerification::rejected(payload, signature);
        };

        let Some(verifier) = &self.verifier else {
            error!("Webhook rejected: no signature verifier configured");
            return WebhookVerification::rejected(payload, signature);
        };

        let verified = verifier.verify(body, sig);
        if !verified {
            warn!("Webhook rejected: signature mismatch");
        }

        WebhookVerification {
            verified,
            payload,
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    const SECRET: &str = "cron-secret-for-tests";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_cron_authorized() {
        let cron = CronAuthorizer::new(Some(SECRET.to_string()));
        assert!(cron.authorize(&bearer(SECRET)).is_ok());
    }

    #[test]
    fn test_cron_rejections() {
        let cron = CronAuthorizer::new(Some(SECRET.to_string()));
        assert!(cron.authorize(&bearer("cron-secret-for-test")).is_err());
        assert!(cron.authorize(&bearer("wrong")).is_err());
        assert!(cron.authorize(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_cron_unconfigured_fails_closed() {
        for secret in [None, Some(String::new()), Some("   ".to_string())] {
            let cron = CronAuthorizer::new(secret);
            assert!(!cron.is_configured());

            let err = cron.authorize(&bearer("")).unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
            assert!(cron.authorize(&bearer("anything")).is_err());
        }
    }

    #[test]
    fn test_hmac_verifier() {
        let verifier = HmacSha256Verifier::new("whsec_test");
        let payload = br#"{"type":"invoice.paid"}"#;
        let signature = verifier.sign(payload).unwrap();

        assert_eq!(signature.len(), 64);
        assert!(verifier.verify(payload, &signature));
        assert!(verifier.verify(payload, &format!("sha256={}", signature)));
        assert!(verifier.verify(payload, &signature.to_uppercase()));
        assert!(!verifier.verify(b"tampered", &signature));
        assert!(!verifier.verify(payload, "not-hex"));
    }

    fn webhook_gate() -> (WebhookAuthorizer, Arc<HmacSha256Verifier>) {
        let verifier = Arc::new(HmacSha256Verifier::new("whsec_test"));
        let gate = WebhookAuthorizer::new(
            "X-Webhook-Signature",
            Some(verifier.clone() as Arc<dyn WebhookSignatureVerifier>),
        );
        (gate, verifier)
    }

    fn signed(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(DEFAULT_SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn test_webhook_verified() {
        let (gate, verifier) = webhook_gate();
        let body = Bytes::from_static(b"{\"type\":\"invoice.paid\"}");
        let signature = verifier.sign(&body).unwrap();

        let result = gate.authorize(&signed(&signature), body.clone());
        assert!(result.verified);
        assert_eq!(result.payload, Some(body));
        assert_eq!(result.signature, Some(signature));
    }

    #[test]
    fn test_webhook_missing_signature_or_body() {
        let (gate, verifier) = webhook_gate();
        let body = Bytes::from_static(b"{}");

        let result = gate.authorize(&HeaderMap::new(), body.clone());
        assert!(!result.verified);
        assert!(result.signature.is_none());

        let signature = verifier.sign(b"").unwrap();
        let result = gate.authorize(&signed(&signature), Bytes::new());
        assert!(!result.verified);
        assert!(result.payload.is_none());
    }

    #[test]
    fn test_webhook_without_verifier() {
        let gate = WebhookAuthorizer::new(DEFAULT_SIGNATURE_HEADER, None);
        let result = gate.authorize(&signed("abc"), Bytes::from_static(b"{}"));
        assert!(!result.verified);
    }
}
