//! Fractionalization endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultQuery {
	pub asset_id: i32,
}

/// `GET /api/fractions/vault?assetId=` - vault token metadata, or a 404
/// carrying `action: MINT_LICENSE_TOKEN` while the vault does not exist yet.
pub async fn vault(
	State(state): State<Arc<AppState>>,
	Query(query): Query<VaultQuery>,
) -> ApiResult<Json<Value>> {
	let info = state
		.fractions
		.vault_for_asset(state.vault.as_ref(), query.asset_id)
		.await?;
	Ok(Json(json!({ "success": true, "vault": info })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
	pub asset_id: i32,
	pub price_per_token: f64,
}

/// `POST /api/fractions/activate` - put the asset's royalty-token supply on
/// primary sale.
pub async fn activate(
	State(state): State<Arc<AppState>>,
	Json(body): Json<ActivateRequest>,
) -> ApiResult<Json<Value>> {
	let fractionalization = state
		.fractions
		.activate(state.vault.as_ref(), body.asset_id, body.price_per_token)
		.await?;
	Ok(Json(json!({
		"success": true,
		"data": { "fractionalization": fractionalization },
	})))
}
