//! Sentinel endpoints

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::AppState;
use crate::common::CoreError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
	pub asset_id: i32,
}

/// `POST /api/sentinel/scan` - scan one asset against the catalog.
pub async fn scan(
	State(state): State<Arc<AppState>>,
	Json(body): Json<ScanRequest>,
) -> ApiResult<Json<Value>> {
	let report = state.sentinel.scan_asset(body.asset_id).await?;
	Ok(Json(json!({
		"success": true,
		"scan": report.scan,
		"alerts": report.alerts,
	})))
}

/// `POST /api/sentinel/check` - multipart `file`; fingerprint suspect bytes
/// against the catalog without persisting anything.
pub async fn check(
	State(state): State<Arc<AppState>>,
	mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
	let mut file: Option<(String, Vec<u8>)> = None;
	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| CoreError::Validation(format!("malformed multipart body: {e}")))?
	{
		if field.name() == Some("file") {
			let content_type = field
				.content_type()
				.unwrap_or("application/octet-stream")
				.to_string();
			let bytes = field
				.bytes()
				.await
				.map_err(|e| CoreError::Validation(format!("unreadable file field: {e}")))?;
			file = Some((content_type, bytes.to_vec()));
		}
	}
	let (content_type, bytes) =
		file.ok_or_else(|| CoreError::Validation("missing file field".into()))?;

	let matches = state.sentinel.check_bytes(&bytes, &content_type).await?;
	Ok(Json(json!({ "success": true, "matches": matches })))
}
