//! Upload orchestrator
//!
//! Drives an upload through the full registration pipeline in strict order:
//! fingerprint, watermark, storage upload, thumbnail, metadata, database
//! insert, then the opt-in on-chain steps. Each step reports progress to the
//! caller. Criticality is fixed: fingerprint, storage upload and the insert
//! abort the run; watermark, thumbnail and metadata log and continue; a
//! failed chain step leaves the asset short of REGISTERED so the recovery
//! flow can resume it later.

use std::io::Cursor;
use std::sync::Arc;

use chrono::Utc;
use image::ImageOutputFormat;
use sea_orm::prelude::Uuid;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use serde_json::json;
use tracing::{info, warn};

use crate::chain::ip::{IpApi, IpMetadata, LicenseParams};
use crate::chain::registry::RegistryApi;
use crate::chain::vault::vault_from_mint_logs;
use crate::common::{CoreError, Result};
use crate::content::{hash, thumbnail, watermark};
use crate::infra::db::entities::asset::{self, AssetStatus};
use crate::storage::StorageGateway;

/// License flavor requested at upload time.
#[derive(Debug, Clone)]
pub enum LicenseRequest {
	NonCommercial,
	Commercial(LicenseParams),
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
	pub owner_id: i32,
	pub title: String,
	pub description: Option<String>,
	pub file_name: String,
	pub mime_type: String,
	pub bytes: Vec<u8>,
	/// Step 7: register the content hash on the asset registry contract.
	pub register_on_chain: bool,
	/// Step 8: register the work as an IP Asset with license terms.
	pub license: Option<LicenseRequest>,
}

#[derive(Debug)]
pub struct UploadOutcome {
	pub asset: asset::Model,
	pub watermark_applied: bool,
	/// Non-fatal step failures, already logged, surfaced for the caller
	pub warnings: Vec<String>,
}

pub struct UploadOrchestrator {
	db: DatabaseConnection,
	storage: Arc<dyn StorageGateway>,
	registry: Arc<dyn RegistryApi>,
	ip: Arc<dyn IpApi>,
}

impl UploadOrchestrator {
	pub fn new(
		db: DatabaseConnection,
		storage: Arc<dyn StorageGateway>,
		registry: Arc<dyn RegistryApi>,
		ip: Arc<dyn IpApi>,
	) -> Self {
		Self {
			db,
			storage,
			registry,
			ip,
		}
	}

	/// Run the pipeline. `progress` receives `(step_index, message)` before
	/// each step starts.
	pub async fn run(
		&self,
		request: UploadRequest,
		mut progress: impl FnMut(usize, &str) + Send,
	) -> Result<UploadOutcome> {
		let mut warnings = Vec::new();

		// Step 1: content fingerprint. Fatal, nothing persisted yet.
		progress(1, "generating content fingerprint");
		if request.bytes.is_empty() {
			return Err(CoreError::Validation("uploaded file is empty".into()));
		}
		if request.title.trim().is_empty() {
			return Err(CoreError::Validation("title is required".into()));
		}
		let content_hash = hash::sha256_hex(&request.bytes);
		let watermark_id = hash::generate_watermark_id();

		// Step 2: watermark embedding, images only. Non-fatal: a file we
		// cannot watermark is still registrable.
		progress(2, "embedding watermark");
		let (upload_bytes, watermark_applied) = match self
			.watermark_bytes(&request.bytes, &request.mime_type, &watermark_id)
		{
			Ok(Some(bytes)) => (bytes, true),
			Ok(None) => (request.bytes.clone(), false),
			Err(e) => {
				warn!("watermark embedding failed, continuing unwatermarked: {e}");
				warnings.push(format!("watermark not applied: {e}"));
				(request.bytes.clone(), false)
			}
		};

		// Step 3: pin the primary file. Fatal.
		progress(3, "uploading to storage gateway");
		let pinned = self
			.storage
			.upload_file(upload_bytes, &request.file_name, &request.mime_type)
			.await
			.map_err(|e| CoreError::PipelineAborted {
				step: 3,
				message: e.to_string(),
			})?;
		info!(cid = %pinned.cid, "primary file pinned");

		// Step 4: thumbnail. Non-fatal.
		progress(4, "generating thumbnail");
		let thumb = match thumbnail::generate(&request.bytes, &request.mime_type) {
			Ok(Some(thumb)) => {
				let name = format!("thumb_{}", request.file_name);
				match self.storage.upload_file(thumb.bytes, &name, "image/png").await {
					Ok(pinned) => Some(pinned),
					Err(e) => {
						warn!("thumbnail upload failed: {e}");
						warnings.push(format!("thumbnail not stored: {e}"));
						None
					}
				}
			}
			Ok(None) => None,
			Err(e) => {
				warn!("thumbnail generation failed: {e}");
				warnings.push(format!("thumbnail not generated: {e}"));
				None
			}
		};

		// Step 5: metadata JSON. Non-fatal.
		progress(5, "uploading metadata");
		let metadata = json!({
			"name": request.title,
			"description": request.description,
			"image": pinned.url,
			"contentHash": format!("0x{content_hash}"),
			"watermarkId": watermark_id,
			"mimeType": request.mime_type,
			"thumbnail": thumb.as_ref().map(|t| t.url.clone()),
		});
		let metadata_bytes = serde_json::to_vec(&metadata)
			.map_err(|e| CoreError::Other(anyhow::anyhow!("metadata encode: {e}")))?;
		let metadata_hash = hash::metadata_hash(&metadata_bytes);
		let metadata_pin = match self
			.storage
			.upload_json(&metadata, &format!("{}.metadata.json", request.file_name))
			.await
		{
			Ok(pinned) => Some(pinned),
			Err(e) => {
				warn!("metadata upload failed: {e}");
				warnings.push(format!("metadata not stored: {e}"));
				None
			}
		};

		// Step 6: persist the asset row. Fatal: later steps have nowhere to
		// record their evidence without it.
		progress(6, "saving asset record");
		let now = Utc::now();
		let active = asset::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			owner_id: Set(request.owner_id),
			title: Set(request.title.clone()),
			description: Set(request.description.clone()),
			mime_type: Set(request.mime_type.clone()),
			file_size: Set(request.bytes.len() as i64),
			content_hash: Set(Some(content_hash.clone())),
			watermark_id: Set(Some(watermark_id.clone())),
			pinata_cid: Set(Some(pinned.cid.clone())),
			pinata_url: Set(Some(pinned.url.clone())),
			thumbnail_cid: Set(thumb.as_ref().map(|t| t.cid.clone())),
			thumbnail_url: Set(thumb.as_ref().map(|t| t.url.clone())),
			metadata_hash: Set(Some(metadata_hash.clone())),
			metadata_cid: Set(metadata_pin.as_ref().map(|p| p.cid.clone())),
			metadata_url: Set(metadata_pin.as_ref().map(|p| p.url.clone())),
			registered_on_chain: Set(false),
			status: Set(AssetStatus::Draft.into()),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		};
		let mut asset = active.insert(&self.db).await.map_err(|e| {
			CoreError::PipelineAborted {
				step: 6,
				message: e.to_string(),
			}
		})?;

		// Entering the chain phase advances the row to PROCESSING; it stays
		// there if a chain step fails, which diagnosis reads as in-flight.
		if request.register_on_chain || request.license.is_some() {
			let mut active: asset::ActiveModel = asset.into();
			active.status = Set(AssetStatus::Processing.into());
			active.updated_at = Set(Utc::now());
			asset = active.update(&self.db).await?;
		}

		// Step 7: registry registration, opt-in.
		if request.register_on_chain {
			progress(7, "registering on-chain");
			let metadata_uri = metadata_pin.as_ref().map(|p| p.url.as_str()).unwrap_or("");
			match self
				.registry
				.register_asset(&content_hash, metadata_uri, &watermark_id)
				.await
			{
				Ok(registration) => {
					info!(
						token_id = registration.token_id,
						source = registration.token_id_source,
						"asset registered on-chain"
					);
					asset = self
						.record_registry(asset, registration.token_id, &registration.tx_hash)
						.await?;
				}
				Err(e) => {
					warn!("on-chain registration failed, asset left for recovery: {e}");
					warnings.push(format!("on-chain registration failed: {e}"));
				}
			}
		}

		// Step 8: IP protocol registration, opt-in. Failure leaves the row
		// without a protocol id; the recovery flow can retry it.
		if let Some(license) = &request.license {
			progress(8, "registering IP asset");
			match self.register_ip(&asset, license).await {
				Ok(updated) => asset = updated,
				Err(e) => {
					warn!("IP registration failed: {e}");
					warnings.push(format!("IP registration failed: {e}"));
				}
			}
		}

		Ok(UploadOutcome {
			asset,
			watermark_applied,
			warnings,
		})
	}

	/// Resume step 7 for an existing asset. Checks the chain for a prior
	/// registration first, so a run where the transaction landed but the
	/// database write failed is repaired rather than re-submitted.
	pub async fn resume_registry(&self, asset_id: i32) -> Result<asset::Model> {
		let asset = self.load(asset_id).await?;
		let content_hash = asset
			.content_hash
			.clone()
			.ok_or_else(|| CoreError::Validation("asset has no content hash".into()))?;
		let watermark_id = asset
			.watermark_id
			.clone()
			.ok_or_else(|| CoreError::Validation("asset has no watermark id".into()))?;

		if asset.dippchain_token_id.is_some() {
			return Ok(asset);
		}

		if let Some(token_id) = self.registry.find_registration(&content_hash).await? {
			info!(token_id, "found prior on-chain registration, repairing record");
			return self.record_registry(asset, token_id, "recovered").await;
		}

		let metadata_uri = asset
			.metadata_url
			.clone()
			.or_else(|| asset.pinata_url.clone())
			.unwrap_or_default();
		let registration = self
			.registry
			.register_asset(&content_hash, &metadata_uri, &watermark_id)
			.await?;
		self.record_registry(asset, registration.token_id, &registration.tx_hash)
			.await
	}

	/// Resume step 8 over the asset's existing registry NFT (direct flow).
	/// Requires step 7 to have completed, since the registry token is the
	/// NFT being promoted to an IP Asset.
	pub async fn resume_ip_direct(
		&self,
		asset_id: i32,
		nft_contract: &str,
		license: LicenseRequest,
	) -> Result<asset::Model> {
		let asset = self.load(asset_id).await?;
		if asset.story_protocol_id.is_some() {
			return Ok(asset);
		}
		let token_id = asset.dippchain_token_id.ok_or_else(|| {
			CoreError::Conflict("asset has no registry token; register on-chain first".into())
		})? as u64;
		let (ip_metadata, params) = self.ip_inputs(&asset, &license)?;

		let registration = self
			.ip
			.register_direct(nft_contract, token_id, &ip_metadata, &params)
			.await?;
		self.ip
			.attach_license_terms(&registration.ip_id, registration.license_terms_id)
			.await?;

		let mut active: asset::ActiveModel = asset.into();
		active.story_protocol_id = Set(Some(registration.ip_id.clone()));
		active.story_protocol_tx_hash = Set(Some(registration.tx_hash.clone()));
		active.story_nft_token_id = Set(Some(token_id as i64));
		active.story_nft_contract = Set(Some(nft_contract.to_string()));
		active.license_terms_id = Set(Some(registration.license_terms_id as i64));
		active.status = Set(AssetStatus::Registered.into());
		active.updated_at = Set(Utc::now());
		let updated = active.update(&self.db).await?;
		self.mint_vault_trigger(updated).await
	}

	/// Resume step 8 for an existing asset.
	pub async fn resume_ip(
		&self,
		asset_id: i32,
		license: LicenseRequest,
	) -> Result<asset::Model> {
		let asset = self.load(asset_id).await?;
		if asset.story_protocol_id.is_some() {
			return Ok(asset);
		}
		let (ip_metadata, params) = self.ip_inputs(&asset, &license)?;

		let registration = self.ip.register_via_gateway(&ip_metadata, &params).await?;
		self.ip
			.attach_license_terms(&registration.ip_id, registration.license_terms_id)
			.await?;

		let mut active: asset::ActiveModel = asset.into();
		active.story_protocol_id = Set(Some(registration.ip_id.clone()));
		active.story_protocol_tx_hash = Set(Some(registration.tx_hash.clone()));
		active.story_nft_token_id = Set(registration.token_id.map(|id| id as i64));
		active.license_terms_id = Set(Some(registration.license_terms_id as i64));
		active.status = Set(AssetStatus::Registered.into());
		active.updated_at = Set(Utc::now());
		let updated = active.update(&self.db).await?;
		self.mint_vault_trigger(updated).await
	}

	/// Metadata and license parameters for an IP registration over an
	/// already-persisted asset.
	fn ip_inputs(
		&self,
		asset: &asset::Model,
		license: &LicenseRequest,
	) -> Result<(IpMetadata, LicenseParams)> {
		let metadata_uri = asset
			.metadata_url
			.clone()
			.ok_or(crate::common::ChainError::MissingMetadata)?;
		let metadata_hash = asset
			.metadata_hash
			.clone()
			.ok_or(crate::common::ChainError::MissingMetadata)?;
		let ip_metadata = IpMetadata {
			ip_metadata_uri: metadata_uri.clone(),
			ip_metadata_hash: metadata_hash.clone(),
			nft_metadata_uri: metadata_uri,
			nft_metadata_hash: metadata_hash,
		};
		let params = match license {
			LicenseRequest::NonCommercial => LicenseParams {
				commercial_rev_share: 0,
				default_minting_fee: 0,
			},
			LicenseRequest::Commercial(params) => params.clone(),
		};
		Ok((ip_metadata, params))
	}

	async fn load(&self, asset_id: i32) -> Result<asset::Model> {
		use sea_orm::EntityTrait;
		asset::Entity::find_by_id(asset_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("asset {asset_id}")))
	}

	/// Decode, watermark and re-encode an image. `Ok(None)` means the MIME
	/// type is not an image and the original bytes should be used as-is.
	fn watermark_bytes(
		&self,
		bytes: &[u8],
		mime_type: &str,
		watermark_id: &str,
	) -> Result<Option<Vec<u8>>> {
		if !mime_type.starts_with("image/") {
			return Ok(None);
		}
		let image = image::load_from_memory(bytes)
			.map_err(|e| CoreError::Validation(format!("unreadable image: {e}")))?;
		let marked = watermark::embed(&image, watermark_id)
			.map_err(|e| CoreError::Validation(e.to_string()))?;

		let mut out = Cursor::new(Vec::new());
		marked
			.write_to(&mut out, ImageOutputFormat::Png)
			.map_err(|e| CoreError::Validation(format!("image encode: {e}")))?;
		Ok(Some(out.into_inner()))
	}

	async fn record_registry(
		&self,
		asset: asset::Model,
		token_id: u64,
		tx_hash: &str,
	) -> Result<asset::Model> {
		let mut active: asset::ActiveModel = asset.into();
		active.dippchain_token_id = Set(Some(token_id as i64));
		active.dippchain_tx_hash = Set(Some(tx_hash.to_string()));
		active.registered_on_chain = Set(true);
		active.updated_at = Set(Utc::now());
		Ok(active.update(&self.db).await?)
	}

	async fn register_ip(
		&self,
		asset: &asset::Model,
		license: &LicenseRequest,
	) -> Result<asset::Model> {
		let (ip_metadata, params) = self.ip_inputs(asset, license)?;

		let registration = self.ip.register_via_gateway(&ip_metadata, &params).await?;
		info!(ip_id = %registration.ip_id, "IP asset registered");

		let mut active: asset::ActiveModel = asset.clone().into();
		active.story_protocol_id = Set(Some(registration.ip_id.clone()));
		active.story_protocol_tx_hash = Set(Some(registration.tx_hash.clone()));
		active.story_nft_token_id = Set(registration.token_id.map(|id| id as i64));
		active.license_terms_id = Set(Some(registration.license_terms_id as i64));
		active.status = Set(AssetStatus::Registered.into());
		active.updated_at = Set(Utc::now());
		let updated = active.update(&self.db).await?;
		self.mint_vault_trigger(updated).await
	}

	/// Mint the single license token that triggers royalty vault deployment,
	/// caching the vault address when the mint receipt already carries it. A
	/// failed mint is logged and left for the explicit vault-init flow.
	async fn mint_vault_trigger(&self, asset: asset::Model) -> Result<asset::Model> {
		let (Some(ip_id), Some(terms)) = (asset.story_protocol_id.clone(), asset.license_terms_id)
		else {
			return Ok(asset);
		};

		let mint = match self.ip.mint_license_token(&ip_id, terms as u64, &ip_id).await {
			Ok(mint) => mint,
			Err(e) => {
				warn!("license token mint failed, vault deployment deferred: {e}");
				return Ok(asset);
			}
		};
		info!(tx_hash = %mint.tx_hash, "license token minted");

		if let Some(vault) = vault_from_mint_logs(&mint.logs) {
			let mut active: asset::ActiveModel = asset.into();
			active.royalty_vault_address = Set(Some(format!("{vault:?}")));
			active.updated_at = Set(Utc::now());
			return Ok(active.update(&self.db).await?);
		}
		Ok(asset)
	}

	/// Retire an asset. Rows are archived in place, never deleted.
	pub async fn archive(&self, asset_id: i32) -> Result<asset::Model> {
		let asset = self.load(asset_id).await?;
		if asset.status() == AssetStatus::Archived {
			return Ok(asset);
		}
		let mut active: asset::ActiveModel = asset.into();
		active.status = Set(AssetStatus::Archived.into());
		active.updated_at = Set(Utc::now());
		Ok(active.update(&self.db).await?)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	use async_trait::async_trait;
	use ethers::types::{Bytes, Log};
	use pretty_assertions::assert_eq;
	use sea_orm::EntityTrait;

	use super::*;
	use crate::chain::ip::{IpRegistration, LicenseMint};
	use crate::chain::registry::Registration;
	use crate::common::ChainError;
	use crate::infra::db::entities::user;
	use crate::storage::{GatewayError, Pinned};

	const VAULT: &str = "0x00000000000000000000000000000000000000dd";

	struct FakeGateway {
		fail_file: bool,
		uploads: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl StorageGateway for FakeGateway {
		async fn upload_file(
			&self,
			_bytes: Vec<u8>,
			name: &str,
			_content_type: &str,
		) -> std::result::Result<Pinned, GatewayError> {
			if self.fail_file {
				return Err(GatewayError::Network("connection refused".into()));
			}
			self.uploads.lock().unwrap().push(name.to_string());
			Ok(Pinned {
				cid: format!("Qm{name}"),
				url: format!("https://gateway.test/ipfs/Qm{name}"),
			})
		}

		async fn upload_json(
			&self,
			_value: &serde_json::Value,
			name: &str,
		) -> std::result::Result<Pinned, GatewayError> {
			self.uploads.lock().unwrap().push(name.to_string());
			Ok(Pinned {
				cid: format!("Qm{name}"),
				url: format!("https://gateway.test/ipfs/Qm{name}"),
			})
		}
	}

	struct FakeRegistry {
		fail: bool,
	}

	#[async_trait]
	impl RegistryApi for FakeRegistry {
		async fn register_asset(
			&self,
			_content_hash: &str,
			_metadata_uri: &str,
			_watermark_id: &str,
		) -> std::result::Result<Registration, ChainError> {
			if self.fail {
				return Err(ChainError::Rpc("boom".into()));
			}
			Ok(Registration {
				tx_hash: "0xfeed".into(),
				token_id: 42,
				token_id_source: "event",
			})
		}

		async fn find_registration(
			&self,
			_content_hash: &str,
		) -> std::result::Result<Option<u64>, ChainError> {
			Ok(None)
		}
	}

	/// Counts mints and reports the vault address in the mint receipt, the
	/// way the protocol's first license mint does.
	struct FakeIp {
		mints: Arc<AtomicUsize>,
		metadata_uris: Mutex<Vec<String>>,
	}

	impl FakeIp {
		fn new(mints: Arc<AtomicUsize>) -> Self {
			Self {
				mints,
				metadata_uris: Mutex::new(vec![]),
			}
		}

		fn vault_log() -> Log {
			let mut word = [0u8; 32];
			word[31] = 0xdd;
			Log {
				data: Bytes::from(word.to_vec()),
				..Default::default()
			}
		}
	}

	#[async_trait]
	impl IpApi for FakeIp {
		async fn register_direct(
			&self,
			_nft_contract: &str,
			_token_id: u64,
			metadata: &IpMetadata,
			_license: &LicenseParams,
		) -> std::result::Result<IpRegistration, ChainError> {
			self.metadata_uris
				.lock()
				.unwrap()
				.push(metadata.ip_metadata_uri.clone());
			Ok(IpRegistration {
				ip_id: "0x00000000000000000000000000000000000000aa".into(),
				token_id: Some(7),
				tx_hash: "0xbeef".into(),
				license_terms_id: 1,
			})
		}

		async fn register_via_gateway(
			&self,
			metadata: &IpMetadata,
			_license: &LicenseParams,
		) -> std::result::Result<IpRegistration, ChainError> {
			self.metadata_uris
				.lock()
				.unwrap()
				.push(metadata.ip_metadata_uri.clone());
			Ok(IpRegistration {
				ip_id: "0x00000000000000000000000000000000000000aa".into(),
				token_id: Some(7),
				tx_hash: "0xbeef".into(),
				license_terms_id: 1,
			})
		}

		async fn attach_license_terms(
			&self,
			_ip_id: &str,
			_license_terms_id: u64,
		) -> std::result::Result<(), ChainError> {
			Ok(())
		}

		async fn mint_license_token(
			&self,
			_ip_id: &str,
			_license_terms_id: u64,
			_receiver: &str,
		) -> std::result::Result<LicenseMint, ChainError> {
			self.mints.fetch_add(1, Ordering::SeqCst);
			Ok(LicenseMint {
				tx_hash: "0xcafe".into(),
				logs: vec![Self::vault_log()],
			})
		}
	}

	async fn setup(
		fail_upload: bool,
		fail_registry: bool,
	) -> (UploadOrchestrator, DatabaseConnection, Arc<AtomicUsize>) {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let now = Utc::now();
		user::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			wallet_address: Set("0x00000000000000000000000000000000000000ff".into()),
			display_name: Set(Some("creator".into())),
			created_at: Set(now),
			..Default::default()
		}
		.insert(&db)
		.await
		.unwrap();

		let mints = Arc::new(AtomicUsize::new(0));
		let orchestrator = UploadOrchestrator::new(
			db.clone(),
			Arc::new(FakeGateway {
				fail_file: fail_upload,
				uploads: Mutex::new(vec![]),
			}),
			Arc::new(FakeRegistry { fail: fail_registry }),
			Arc::new(FakeIp::new(mints.clone())),
		);
		(orchestrator, db, mints)
	}

	fn request(register: bool, license: bool) -> UploadRequest {
		UploadRequest {
			owner_id: 1,
			title: "Sunset".into(),
			description: Some("a sunset".into()),
			file_name: "sunset.bin".into(),
			mime_type: "application/octet-stream".into(),
			bytes: vec![1, 2, 3, 4],
			register_on_chain: register,
			license: license.then_some(LicenseRequest::NonCommercial),
		}
	}

	#[tokio::test]
	async fn full_pipeline_persists_all_evidence() {
		let (orchestrator, db, mints) = setup(false, false).await;
		let mut steps = Vec::new();
		let outcome = orchestrator
			.run(request(true, true), |step, _| steps.push(step))
			.await
			.unwrap();

		assert_eq!(steps, vec![1, 2, 3, 4, 5, 6, 7, 8]);
		let asset = outcome.asset;
		assert!(asset.content_hash.is_some());
		assert!(asset.pinata_cid.is_some());
		assert!(asset.metadata_url.is_some());
		assert_eq!(asset.dippchain_token_id, Some(42));
		assert!(asset.registered_on_chain);
		assert_eq!(asset.story_protocol_tx_hash.as_deref(), Some("0xbeef"));
		assert_eq!(asset.status(), AssetStatus::Registered);

		// Registration minted the one vault-trigger license token and cached
		// the vault address the mint receipt reported.
		assert_eq!(mints.load(Ordering::SeqCst), 1);
		assert_eq!(asset.royalty_vault_address.as_deref(), Some(VAULT));

		let stored = asset::Entity::find_by_id(asset.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(stored.dippchain_token_id, Some(42));
		assert_eq!(stored.royalty_vault_address.as_deref(), Some(VAULT));
	}

	#[tokio::test]
	async fn storage_failure_aborts_before_persisting() {
		let (orchestrator, db, _) = setup(true, false).await;
		let err = orchestrator
			.run(request(false, false), |_, _| {})
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::PipelineAborted { step: 3, .. }));

		let count = asset::Entity::find().all(&db).await.unwrap();
		assert!(count.is_empty());
	}

	#[tokio::test]
	async fn registry_failure_leaves_asset_in_processing() {
		let (orchestrator, _db, mints) = setup(false, true).await;
		let outcome = orchestrator
			.run(request(true, false), |_, _| {})
			.await
			.unwrap();

		assert_eq!(outcome.asset.status(), AssetStatus::Processing);
		assert_eq!(outcome.asset.dippchain_token_id, None);
		assert!(!outcome.warnings.is_empty());
		assert_eq!(mints.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn opt_out_upload_stays_at_draft() {
		let (orchestrator, _db, mints) = setup(false, false).await;
		let outcome = orchestrator
			.run(request(false, false), |_, _| {})
			.await
			.unwrap();

		assert_eq!(outcome.asset.status(), AssetStatus::Draft);
		assert_eq!(mints.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn resume_uses_the_pinned_metadata_url() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let now = Utc::now();
		let creator = user::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			wallet_address: Set("0x00000000000000000000000000000000000000ff".into()),
			created_at: Set(now),
			..Default::default()
		}
		.insert(&db)
		.await
		.unwrap();

		let asset = asset::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			owner_id: Set(creator.id),
			title: Set("Sunset".into()),
			mime_type: Set("application/octet-stream".into()),
			file_size: Set(4),
			content_hash: Set(Some("ab".repeat(32))),
			watermark_id: Set(Some("DIPP-x-0001".into())),
			pinata_cid: Set(Some("Qmfile".into())),
			pinata_url: Set(Some("https://gateway.test/ipfs/Qmfile".into())),
			metadata_hash: Set(Some(format!("0x{}", "cd".repeat(32)))),
			metadata_cid: Set(Some("Qmmeta".into())),
			metadata_url: Set(Some("https://gateway.test/ipfs/Qmmeta".into())),
			dippchain_token_id: Set(Some(42)),
			dippchain_tx_hash: Set(Some("0xfeed".into())),
			registered_on_chain: Set(true),
			status: Set(AssetStatus::Processing.into()),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		}
		.insert(&db)
		.await
		.unwrap();

		let ip = Arc::new(FakeIp::new(Arc::new(AtomicUsize::new(0))));
		let orchestrator = UploadOrchestrator::new(
			db.clone(),
			Arc::new(FakeGateway {
				fail_file: false,
				uploads: Mutex::new(vec![]),
			}),
			Arc::new(FakeRegistry { fail: false }),
			ip.clone(),
		);

		let registered = orchestrator
			.resume_ip(asset.id, LicenseRequest::NonCommercial)
			.await
			.unwrap();
		assert_eq!(registered.status(), AssetStatus::Registered);

		// The IP registration is built over the pinned metadata JSON, not
		// the primary file.
		assert_eq!(
			ip.metadata_uris.lock().unwrap().as_slice(),
			&["https://gateway.test/ipfs/Qmmeta".to_string()]
		);
	}

	#[tokio::test]
	async fn archive_retires_the_row_without_deleting_it() {
		let (orchestrator, db, _) = setup(false, false).await;
		let outcome = orchestrator
			.run(request(false, false), |_, _| {})
			.await
			.unwrap();

		let archived = orchestrator.archive(outcome.asset.id).await.unwrap();
		assert_eq!(archived.status(), AssetStatus::Archived);

		// Idempotent, and the row survives.
		let again = orchestrator.archive(outcome.asset.id).await.unwrap();
		assert_eq!(again.status(), AssetStatus::Archived);
		assert!(asset::Entity::find_by_id(outcome.asset.id)
			.one(&db)
			.await
			.unwrap()
			.is_some());
	}

	#[tokio::test]
	async fn empty_file_is_rejected_up_front() {
		let (orchestrator, _db, _) = setup(false, false).await;
		let mut req = request(false, false);
		req.bytes.clear();
		let err = orchestrator.run(req, |_, _| {}).await.unwrap_err();
		assert!(matches!(err, CoreError::Validation(_)));
	}
}
