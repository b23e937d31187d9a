//! # API Errors
//!
//! Every handler returns [`ApiResult`]; [`ApiError`] turns a [`ShopError`]
//! into `{"error": .., "code": ..}` with the matching status.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shop_core::{AuthError, ShopError, INTERNAL_ERROR_MESSAGE};
use std::any::Any;
use tracing::error;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

#[derive(Debug)]
pub struct ApiError(pub ShopError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ShopError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let code = err.status_code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Stripe's dashboard shows this body verbatim
        if let ShopError::WebhookSignature(reason) = &err {
            return (status, format!("Webhook Error: {}", reason)).into_response();
        }

        if err.is_server_error() && !matches!(err, ShopError::Configuration(_)) {
            error!("Request failed: {}", err);
        }

        let body = ErrorResponse {
            error: err.client_message().into_owned(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

/// Response for a handler panic caught by `CatchPanicLayer`
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    error!("Handler panicked: {}", detail);

    let body = ErrorResponse {
        error: INTERNAL_ERROR_MESSAGE.to_string(),
        code: 500,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// `Json` extractor whose rejections use the API error shape
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
