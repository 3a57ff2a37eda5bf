//! REST API module.
//!
//! Every handler answers with the `{success, data}` envelope or an [`AppError`] envelope.

mod arguments;
mod auth;
mod debates;
mod profiles;
mod realtime;
mod search;
mod storage;
mod votes;

pub use arguments::*;
pub use auth::*;
pub use debates::*;
pub use profiles::*;
pub use realtime::*;
pub use search::*;
pub use storage::*;
pub use votes::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}
