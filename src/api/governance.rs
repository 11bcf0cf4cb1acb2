//! Governance endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::AppState;
use crate::common::CoreError;
use crate::governance::NewProposal;
use crate::infra::db::entities::{user, VoteChoice};
use crate::market::settlement::normalize_address;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
	pub proposer_address: String,
	pub title: String,
	pub description: String,
	#[serde(default = "default_voting_days")]
	pub voting_days: i64,
	#[serde(default)]
	pub quorum: i64,
}

fn default_voting_days() -> i64 {
	7
}

/// `POST /api/governance/proposals`.
pub async fn create_proposal(
	State(state): State<Arc<AppState>>,
	Json(body): Json<CreateProposalRequest>,
) -> ApiResult<Json<Value>> {
	let proposer = find_user(&state, &body.proposer_address).await?;
	let proposal = state
		.governance
		.create_proposal(NewProposal {
			proposer_id: proposer.id,
			title: body.title,
			description: body.description,
			voting_days: body.voting_days,
			quorum: body.quorum,
		})
		.await?;
	Ok(Json(json!({ "success": true, "data": { "proposal": proposal } })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
	pub proposal_id: i32,
	pub voter_address: String,
	pub choice: String,
}

/// `POST /api/governance/vote`.
pub async fn vote(
	State(state): State<Arc<AppState>>,
	Json(body): Json<VoteRequest>,
) -> ApiResult<Json<Value>> {
	let choice = match body.choice.as_str() {
		"for" => VoteChoice::For,
		"against" => VoteChoice::Against,
		"abstain" => VoteChoice::Abstain,
		other => {
			return Err(CoreError::Validation(format!("unknown vote choice: {other}")).into())
		}
	};
	let voter = find_user(&state, &body.voter_address).await?;
	let vote = state
		.governance
		.cast_vote(body.proposal_id, voter.id, choice)
		.await?;
	Ok(Json(json!({ "success": true, "data": { "vote": vote } })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
	pub proposal_id: i32,
}

/// `POST /api/governance/finalize`.
pub async fn finalize(
	State(state): State<Arc<AppState>>,
	Json(body): Json<FinalizeRequest>,
) -> ApiResult<Json<Value>> {
	let proposal = state.governance.finalize(body.proposal_id).await?;
	Ok(Json(json!({ "success": true, "data": { "proposal": proposal } })))
}

async fn find_user(state: &AppState, wallet: &str) -> Result<user::Model, CoreError> {
	let normalized = normalize_address(wallet);
	user::Entity::find()
		.filter(user::Column::WalletAddress.eq(normalized.clone()))
		.one(&state.db)
		.await?
		.ok_or_else(|| CoreError::NotFound(format!("user {normalized}")))
}
