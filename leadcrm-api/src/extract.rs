/// Request extractors whose rejections use the API error format
///
/// Drop-in replacements for `axum::Json` and `axum::extract::Path` in
/// handlers: a malformed body or path answers with an [`ApiError`] JSON body
/// instead of axum's plain-text rejection.

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
