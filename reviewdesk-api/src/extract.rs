/// Request extractors with JSON error bodies
///
/// Axum's own `Json` and `Path` reject with plain text. These wrappers run
/// the same extraction and turn the rejection into an [`ApiError`], so a
/// malformed body or path parameter gets the usual `{ error, message }`
/// shape.
///
/// ```
/// use reviewdesk_api::extract::{ApiJson, ApiPath};
/// use serde::Deserialize;
/// use uuid::Uuid;
///
/// #[derive(Deserialize)]
/// struct Rename {
///     name: String,
/// }
///
/// async fn handler(ApiPath(id): ApiPath<Uuid>, ApiJson(body): ApiJson<Rename>) -> String {
///     format!("{} -> {}", id, body.name)
/// }
/// ```

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON body extractor
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameter extractor
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
