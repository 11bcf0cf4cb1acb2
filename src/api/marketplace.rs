//! Marketplace endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::AppState;
use crate::market::{PrimaryBuy, SecondaryBuy};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyPrimaryRequest {
	pub fractionalization_id: i32,
	pub buyer_address: String,
	pub amount: i64,
	pub tx_hash: String,
}

/// `POST /api/marketplace/buy-primary`. The response returns before the
/// token transfer happens; the order stays PENDING_TRANSFER until the outbox
/// worker confirms it.
pub async fn buy_primary(
	State(state): State<Arc<AppState>>,
	Json(body): Json<BuyPrimaryRequest>,
) -> ApiResult<Json<Value>> {
	let outcome = state
		.settlement
		.buy_primary(PrimaryBuy {
			fractionalization_id: body.fractionalization_id,
			buyer_address: body.buyer_address,
			amount: body.amount,
			payment_tx_hash: body.tx_hash,
		})
		.await?;
	Ok(Json(json!({
		"success": true,
		"order": outcome.order,
		"transferInProgress": outcome.transfer_in_progress,
	})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuySecondaryRequest {
	pub listing_id: i32,
	pub buyer_address: String,
	pub amount: i64,
	pub tx_hash: String,
}

/// `POST /api/marketplace/buy-secondary`.
pub async fn buy_secondary(
	State(state): State<Arc<AppState>>,
	Json(body): Json<BuySecondaryRequest>,
) -> ApiResult<Json<Value>> {
	let outcome = state
		.settlement
		.buy_secondary(SecondaryBuy {
			listing_id: body.listing_id,
			buyer_address: body.buyer_address,
			amount: body.amount,
			payment_tx_hash: body.tx_hash,
		})
		.await?;
	Ok(Json(json!({
		"success": true,
		"order": outcome.order,
		"transferInProgress": outcome.transfer_in_progress,
	})))
}
