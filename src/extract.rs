use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::ApiError;

/// ApiJson
///
/// `axum::Json` for request bodies, with rejections (bad JSON, missing
/// content type, missing fields) answered as `ApiError` so the body keeps the
/// `{"message": ...}` shape.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// ApiQuery
///
/// `axum::extract::Query` with the same rejection handling as [`ApiJson`].
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
