/// Inbound webhook endpoints
///
/// Webhooks carry no user credentials. The raw body is checked against the
/// provider's signature header before anything is parsed.
///
/// # Endpoints
///
/// - `POST /v1/webhooks/billing` - Billing provider events

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

/// Acknowledgement returned to the provider
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,

    /// Event type, when the payload names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

/// Accepts a signed billing event
///
/// # Errors
///
/// - 400 if the body or signature is missing or the signature does not verify
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let verification = state.webhooks.authorize(&headers, body);

    let payload = match verification.payload {
        Some(payload) if verification.verified => payload,
        _ => return Err(ApiError::BadRequest("Invalid webhook signature".to_string())),
    };

    let event_type = serde_json::from_slice::<JsonValue>(&payload)
        .ok()
        .and_then(|event| event.get("type").and_then(JsonValue::as_str).map(str::to_string));

    info!(event_type = ?event_type, bytes = payload.len(), "Billing webhook received");

    Ok(Json(WebhookAck {
        received: true,
        event_type,
    }))
}
