//! IP protocol endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::AppState;
use crate::chain::vault::VaultResolution;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeVaultRequest {
	pub ip_id: String,
	#[serde(default)]
	pub license_terms_id: Option<u64>,
	#[serde(default)]
	pub receiver: Option<String>,
}

/// `POST /api/story/initialize-vault` - mint a license token to force the
/// royalty vault into existence, then resolve its address.
pub async fn initialize_vault(
	State(state): State<Arc<AppState>>,
	Json(body): Json<InitializeVaultRequest>,
) -> ApiResult<Json<Value>> {
	let outcome = state
		.fractions
		.initialize_vault(
			state.ip.as_ref(),
			state.vault.as_ref(),
			&body.ip_id,
			body.license_terms_id,
			body.receiver.as_deref(),
		)
		.await?;

	let (deployed, vault_address) = match &outcome.vault {
		VaultResolution::Deployed(address) => (true, Some(address.clone())),
		VaultResolution::NotYetDeployed => (false, None),
	};
	Ok(Json(json!({
		"success": true,
		"mintTxHash": outcome.mint_tx_hash,
		"deployed": deployed,
		"vaultAddress": vault_address,
	})))
}
