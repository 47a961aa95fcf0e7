/// Remote identity verification
///
/// Asks the identity service who a token belongs to with
/// `GET {base_url}/auth/v1/user`. Used when the API does not hold the token
/// signing secret.
///
/// | Service answer | Outcome |
/// |---|---|
/// | 2xx with a JSON body | identity object |
/// | 401 / 403 | `IdentityError::Invalid` |
/// | anything else, or no answer | `IdentityError::Unavailable` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value as JsonValue;

use super::credentials::RawCredential;
use super::identity::{IdentityError, IdentityVerifier};

const USER_PATH: &str = "/auth/v1/user";

/// Identity verifier backed by the identity service's user endpoint
pub struct RemoteIdentityVerifier {
    client: reqwest::Client,
    user_url: String,
    service_key: String,
}

impl RemoteIdentityVerifier {
    /// Creates a verifier for the service at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            user_url: user_url(base_url),
            service_key: service_key.to_string(),
        })
    }
}

fn user_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), USER_PATH)
}

#[async_trait]
impl IdentityVerifier for RemoteIdentityVerifier {
    async fn verify(&self, credential: &RawCredential) -> Result<JsonValue, IdentityError> {
        let response = self
            .client
            .get(&self.user_url)
            .bearer_auth(&credential.value)
            .header("apikey", &self.service_key)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<JsonValue>()
                .await
                .map_err(|e| IdentityError::Unavailable(format!("unreadable identity: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Invalid(
                format!("identity service rejected token ({})", response.status()),
            )),
            status => Err(IdentityError::Unavailable(format!(
                "identity service returned {}",
                status
            ))),
        }
    }
}
