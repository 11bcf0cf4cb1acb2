//! API error envelope
//!
//! Every failure leaves the server as `{success: false, error: {message,
//! code, details}}`. Messages classified as user-friendly are shown
//! verbatim; everything else gets a generic message with the raw text
//! preserved under `details`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::common::{ChainError, CoreError};
use crate::storage::GatewayError;

pub struct ApiError(pub CoreError);

impl<E> From<E> for ApiError
where
	E: Into<CoreError>,
{
	fn from(err: E) -> Self {
		Self(err.into())
	}
}

impl ApiError {
	fn status(&self) -> StatusCode {
		match &self.0 {
			CoreError::Validation(_) => StatusCode::BAD_REQUEST,
			CoreError::NotFound(_) => StatusCode::NOT_FOUND,
			CoreError::Conflict(_) => StatusCode::CONFLICT,
			// The vault legitimately may not exist yet; the client is told
			// what to do about it.
			CoreError::Chain(ChainError::VaultNotDeployed(_)) => StatusCode::NOT_FOUND,
			CoreError::Chain(ChainError::Rpc(_))
			| CoreError::Chain(ChainError::EndpointsExhausted { .. })
			| CoreError::Gateway(GatewayError::Network(_)) => StatusCode::SERVICE_UNAVAILABLE,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		let raw = self.0.to_string();
		let message = if self.0.user_friendly() {
			raw.clone()
		} else {
			"operation failed".to_string()
		};
		if status.is_server_error() {
			error!(code = self.0.code().as_str(), "request failed: {raw}");
		}

		let mut body = json!({
			"success": false,
			"error": {
				"message": message,
				"code": self.0.code().as_str(),
				"details": raw,
			},
		});
		if let CoreError::Chain(ChainError::VaultNotDeployed(_)) = &self.0 {
			body["action"] = json!("MINT_LICENSE_TOKEN");
		}

		(status, Json(body)).into_response()
	}
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn validation_maps_to_400() {
		let err = ApiError(CoreError::Validation("amount must be positive".into()));
		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn missing_vault_maps_to_404() {
		let err = ApiError(CoreError::Chain(ChainError::VaultNotDeployed(
			"0xabc".into(),
		)));
		assert_eq!(err.status(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn rpc_exhaustion_maps_to_503() {
		let err = ApiError(CoreError::Chain(ChainError::EndpointsExhausted {
			attempts: 3,
			last_error: "connection refused".into(),
		}));
		assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
	}
}
