//! Asset endpoints

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use sea_orm::prelude::Uuid;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::chain::ip::LicenseParams;
use crate::common::CoreError;
use crate::infra::db::entities::asset::{self, AssetStatus};
use crate::pipeline::{diagnose, LicenseRequest, UploadRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
	pub owner_id: i32,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub register_on_chain: bool,
	#[serde(default)]
	pub license_type: Option<String>,
	#[serde(default)]
	pub commercial_rev_share: Option<u32>,
	#[serde(default)]
	pub default_minting_fee: Option<u128>,
}

impl UploadMetadata {
	fn license(&self) -> ApiResult<Option<LicenseRequest>> {
		match self.license_type.as_deref() {
			None => Ok(None),
			Some("non-commercial") => Ok(Some(LicenseRequest::NonCommercial)),
			Some("commercial") => Ok(Some(LicenseRequest::Commercial(LicenseParams {
				commercial_rev_share: self.commercial_rev_share.unwrap_or(10),
				default_minting_fee: self.default_minting_fee.unwrap_or(0),
			}))),
			Some(other) => Err(ApiError(CoreError::Validation(format!(
				"unknown license type: {other}"
			)))),
		}
	}
}

/// `POST /api/assets/upload` - multipart `file` + `metadata` JSON string.
/// Runs the full upload pipeline and reports `cid`/`url` of the pinned file.
pub async fn upload(
	State(state): State<Arc<AppState>>,
	mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
	let mut file: Option<(String, String, Vec<u8>)> = None;
	let mut metadata: Option<UploadMetadata> = None;

	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| CoreError::Validation(format!("malformed multipart body: {e}")))?
	{
		match field.name() {
			Some("file") => {
				let name = field.file_name().unwrap_or("upload.bin").to_string();
				let content_type = field
					.content_type()
					.unwrap_or("application/octet-stream")
					.to_string();
				let bytes = field
					.bytes()
					.await
					.map_err(|e| CoreError::Validation(format!("unreadable file field: {e}")))?;
				file = Some((name, content_type, bytes.to_vec()));
			}
			Some("metadata") => {
				let text = field
					.text()
					.await
					.map_err(|e| CoreError::Validation(format!("unreadable metadata: {e}")))?;
				metadata = Some(serde_json::from_str(&text).map_err(|e| {
					CoreError::Validation(format!("invalid metadata JSON: {e}"))
				})?);
			}
			_ => {}
		}
	}

	let (file_name, mime_type, bytes) =
		file.ok_or_else(|| CoreError::Validation("missing file field".into()))?;
	let metadata =
		metadata.ok_or_else(|| CoreError::Validation("missing metadata field".into()))?;
	let license = metadata.license()?;

	let outcome = state
		.orchestrator
		.run(
			UploadRequest {
				owner_id: metadata.owner_id,
				title: metadata.title,
				description: metadata.description,
				file_name,
				mime_type,
				bytes,
				register_on_chain: metadata.register_on_chain,
				license,
			},
			|step, message| tracing::debug!(step, "{message}"),
		)
		.await?;

	Ok(Json(json!({
		"success": true,
		"cid": outcome.asset.pinata_cid,
		"url": outcome.asset.pinata_url,
		"watermarkApplied": outcome.watermark_applied,
		"warnings": outcome.warnings,
		"data": { "asset": outcome.asset },
	})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAsset {
	pub owner_id: i32,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	pub mime_type: String,
	pub file_size: i64,
	#[serde(default)]
	pub content_hash: Option<String>,
	#[serde(default)]
	pub watermark_id: Option<String>,
	#[serde(default)]
	pub pinata_cid: Option<String>,
	#[serde(default)]
	pub pinata_url: Option<String>,
	#[serde(default)]
	pub metadata_hash: Option<String>,
	#[serde(default)]
	pub metadata_cid: Option<String>,
	#[serde(default)]
	pub metadata_url: Option<String>,
}

/// `POST /api/assets/create` - record an asset whose file was pinned out of
/// band (e.g. by a direct `upload` call from a client-side flow).
pub async fn create(
	State(state): State<Arc<AppState>>,
	Json(body): Json<CreateAsset>,
) -> ApiResult<Json<Value>> {
	if body.title.trim().is_empty() {
		return Err(CoreError::Validation("title is required".into()).into());
	}
	let now = chrono::Utc::now();
	let asset = asset::ActiveModel {
		uuid: Set(Uuid::new_v4()),
		owner_id: Set(body.owner_id),
		title: Set(body.title),
		description: Set(body.description),
		mime_type: Set(body.mime_type),
		file_size: Set(body.file_size),
		content_hash: Set(body.content_hash),
		watermark_id: Set(body.watermark_id),
		pinata_cid: Set(body.pinata_cid),
		pinata_url: Set(body.pinata_url),
		metadata_hash: Set(body.metadata_hash),
		metadata_cid: Set(body.metadata_cid),
		metadata_url: Set(body.metadata_url),
		registered_on_chain: Set(false),
		status: Set(AssetStatus::Draft.into()),
		created_at: Set(now),
		updated_at: Set(now),
		..Default::default()
	}
	.insert(&state.db)
	.await
	.map_err(CoreError::from)?;

	Ok(Json(json!({ "success": true, "data": { "asset": asset } })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIp {
	pub asset_id: i32,
	#[serde(default)]
	pub license_type: Option<String>,
	#[serde(default)]
	pub commercial_rev_share: Option<u32>,
	#[serde(default)]
	pub default_minting_fee: Option<u128>,
}

impl RegisterIp {
	fn license(&self) -> ApiResult<LicenseRequest> {
		let metadata = UploadMetadata {
			owner_id: 0,
			title: String::new(),
			description: None,
			register_on_chain: false,
			license_type: self.license_type.clone(),
			commercial_rev_share: self.commercial_rev_share,
			default_minting_fee: self.default_minting_fee,
		};
		Ok(metadata.license()?.unwrap_or(LicenseRequest::NonCommercial))
	}
}

/// `POST /api/assets/register-ip` - direct flow over the asset's existing
/// registry NFT.
pub async fn register_ip(
	State(state): State<Arc<AppState>>,
	Json(body): Json<RegisterIp>,
) -> ApiResult<Json<Value>> {
	let license = body.license()?;
	let asset = state
		.orchestrator
		.resume_ip_direct(body.asset_id, &state.registry_address, license)
		.await?;
	Ok(registration_response(asset))
}

/// `POST /api/assets/register-ip-modern` - single-transaction gateway flow.
pub async fn register_ip_modern(
	State(state): State<Arc<AppState>>,
	Json(body): Json<RegisterIp>,
) -> ApiResult<Json<Value>> {
	let license = body.license()?;
	let asset = state.orchestrator.resume_ip(body.asset_id, license).await?;
	Ok(registration_response(asset))
}

fn registration_response(asset: asset::Model) -> Json<Value> {
	Json(json!({
		"success": true,
		"ipId": asset.story_protocol_id,
		"tokenId": asset.story_nft_token_id,
		"txHash": asset.story_protocol_tx_hash,
		"licenseTermsId": asset.license_terms_id,
		"royaltyVaultAddress": asset.royalty_vault_address,
	}))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseRequest {
	pub asset_id: i32,
}

/// `POST /api/assets/diagnose` - where did a partial upload stop, and what
/// can be done about it.
pub async fn diagnose_asset(
	State(state): State<Arc<AppState>>,
	Json(body): Json<DiagnoseRequest>,
) -> ApiResult<Json<Value>> {
	let asset = asset::Entity::find_by_id(body.asset_id)
		.one(&state.db)
		.await
		.map_err(CoreError::from)?
		.ok_or_else(|| CoreError::NotFound(format!("asset {}", body.asset_id)))?;

	let diagnosis = diagnose(&asset);
	Ok(Json(json!({ "success": true, "diagnosis": diagnosis })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
	pub asset_id: i32,
}

/// `POST /api/assets/archive` - retire an asset; the row is kept.
pub async fn archive(
	State(state): State<Arc<AppState>>,
	Json(body): Json<ArchiveRequest>,
) -> ApiResult<Json<Value>> {
	let asset = state.orchestrator.archive(body.asset_id).await?;
	Ok(Json(json!({ "success": true, "data": { "asset": asset } })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
	pub asset_id: i32,
}

/// `POST /api/assets/verify-onchain` - resume the registry step, repairing
/// the record if the transaction actually landed.
pub async fn verify_onchain(
	State(state): State<Arc<AppState>>,
	Json(body): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
	let asset = state.orchestrator.resume_registry(body.asset_id).await?;
	Ok(Json(json!({
		"success": true,
		"tokenId": asset.dippchain_token_id,
		"txHash": asset.dippchain_tx_hash,
		"registeredOnChain": asset.registered_on_chain,
	})))
}
