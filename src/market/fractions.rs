//! Fractionalization
//!
//! Activating a fractionalization means the asset's royalty vault exists and
//! its fixed token supply goes on primary sale. The vault only materializes
//! after license terms are attached and at least one license token is minted,
//! so activation can legitimately fail with "not yet deployed" and point the
//! caller at the mint flow.

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::Log;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::Serialize;
use tracing::info;

use crate::chain::ip::IpApi;
use crate::chain::vault::{RoyaltyVaultResolver, VaultResolution};
use crate::common::{ChainError, CoreError, Result};
use crate::infra::db::entities::{
	asset, fractionalization, FractionalizationStatus, ROYALTY_TOKEN_SUPPLY,
};

/// Seam for vault resolution, mockable in tests.
#[async_trait]
pub trait VaultLookup: Send + Sync {
	async fn lookup(
		&self,
		ip_id: &str,
		mint_logs: Option<&[Log]>,
	) -> std::result::Result<VaultResolution, ChainError>;
}

#[async_trait]
impl VaultLookup for RoyaltyVaultResolver {
	async fn lookup(
		&self,
		ip_id: &str,
		mint_logs: Option<&[Log]>,
	) -> std::result::Result<VaultResolution, ChainError> {
		self.resolve(ip_id, mint_logs).await
	}
}

/// Vault metadata returned to the fractions API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultInfo {
	pub asset_id: i32,
	pub ip_id: String,
	pub vault_address: String,
	pub license_terms_id: Option<i64>,
}

#[derive(Debug)]
pub struct VaultInitOutcome {
	pub mint_tx_hash: String,
	pub vault: VaultResolution,
}

pub struct Fractions {
	db: DatabaseConnection,
}

impl Fractions {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	/// Activate trading for an asset's royalty tokens.
	///
	/// Requires a completed IP registration and a deployed vault; the full
	/// supply becomes the primary-sale pool and the asset moves to ACTIVE.
	pub async fn activate(
		&self,
		vault: &dyn VaultLookup,
		asset_id: i32,
		price_per_token: f64,
	) -> Result<fractionalization::Model> {
		if price_per_token <= 0.0 {
			return Err(CoreError::Validation("price per token must be positive".into()));
		}
		let asset = self.load_asset(asset_id).await?;
		let ip_id = asset
			.story_protocol_id
			.clone()
			.ok_or_else(|| CoreError::Conflict("asset is not registered as an IP Asset".into()))?;

		let existing = fractionalization::Entity::find()
			.filter(fractionalization::Column::AssetId.eq(asset_id))
			.one(&self.db)
			.await?;
		if existing.is_some() {
			return Err(CoreError::Conflict("asset is already fractionalized".into()));
		}

		let vault_address = self.resolve_vault(vault, &asset, &ip_id).await?;

		let fractionalization = fractionalization::ActiveModel {
			asset_id: Set(asset_id),
			total_supply: Set(ROYALTY_TOKEN_SUPPLY),
			available_supply: Set(ROYALTY_TOKEN_SUPPLY),
			price_per_token: Set(price_per_token),
			token_address: Set(vault_address),
			status: Set(FractionalizationStatus::Trading.into()),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(&self.db)
		.await?;

		if asset.status() < asset::AssetStatus::Active {
			let mut active: asset::ActiveModel = asset.into();
			active.status = Set(asset::AssetStatus::Active.into());
			active.updated_at = Set(Utc::now());
			active.update(&self.db).await?;
		}

		info!(
			asset_id,
			fractionalization_id = fractionalization.id,
			"fractionalization activated"
		);
		Ok(fractionalization)
	}

	/// Resolve and describe the vault backing an asset's fractions.
	pub async fn vault_for_asset(
		&self,
		vault: &dyn VaultLookup,
		asset_id: i32,
	) -> Result<VaultInfo> {
		let asset = self.load_asset(asset_id).await?;
		let ip_id = asset
			.story_protocol_id
			.clone()
			.ok_or_else(|| CoreError::Conflict("asset is not registered as an IP Asset".into()))?;
		let vault_address = self.resolve_vault(vault, &asset, &ip_id).await?;

		Ok(VaultInfo {
			asset_id,
			ip_id,
			vault_address,
			license_terms_id: asset.license_terms_id,
		})
	}

	/// Force vault deployment by minting a license token, then resolve the
	/// vault from the mint receipt.
	pub async fn initialize_vault(
		&self,
		ip: &dyn IpApi,
		vault: &dyn VaultLookup,
		ip_id: &str,
		license_terms_id: Option<u64>,
		receiver: Option<&str>,
	) -> Result<VaultInitOutcome> {
		let license_terms_id = license_terms_id.unwrap_or(1);
		let receiver = receiver.unwrap_or(ip_id);

		let mint = ip
			.mint_license_token(ip_id, license_terms_id, receiver)
			.await?;
		let resolution = vault.lookup(ip_id, Some(&mint.logs)).await?;

		if let VaultResolution::Deployed(address) = &resolution {
			self.record_vault(ip_id, address).await?;
		}
		Ok(VaultInitOutcome {
			mint_tx_hash: mint.tx_hash,
			vault: resolution,
		})
	}

	async fn resolve_vault(
		&self,
		vault: &dyn VaultLookup,
		asset: &asset::Model,
		ip_id: &str,
	) -> Result<String> {
		if let Some(address) = &asset.royalty_vault_address {
			return Ok(address.clone());
		}
		match vault.lookup(ip_id, None).await? {
			VaultResolution::Deployed(address) => {
				self.record_vault(ip_id, &address).await?;
				Ok(address)
			}
			VaultResolution::NotYetDeployed => {
				Err(ChainError::VaultNotDeployed(ip_id.to_string()).into())
			}
		}
	}

	/// Cache a resolved vault address on the owning asset row.
	async fn record_vault(&self, ip_id: &str, address: &str) -> Result<()> {
		let asset = asset::Entity::find()
			.filter(asset::Column::StoryProtocolId.eq(ip_id))
			.one(&self.db)
			.await?;
		if let Some(asset) = asset {
			if asset.royalty_vault_address.as_deref() != Some(address) {
				let mut active: asset::ActiveModel = asset.into();
				active.royalty_vault_address = Set(Some(address.to_string()));
				active.updated_at = Set(Utc::now());
				active.update(&self.db).await?;
			}
		}
		Ok(())
	}

	async fn load_asset(&self, asset_id: i32) -> Result<asset::Model> {
		asset::Entity::find_by_id(asset_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("asset {asset_id}")))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use sea_orm::prelude::Uuid;

	use super::*;
	use crate::infra::db::entities::asset::AssetStatus;
	use crate::infra::db::entities::user;

	const VAULT: &str = "0x00000000000000000000000000000000000000dd";

	struct FixedVault(VaultResolution);

	#[async_trait]
	impl VaultLookup for FixedVault {
		async fn lookup(
			&self,
			_ip_id: &str,
			_mint_logs: Option<&[Log]>,
		) -> std::result::Result<VaultResolution, ChainError> {
			Ok(self.0.clone())
		}
	}

	async fn seed_asset(db: &DatabaseConnection, registered: bool) -> asset::Model {
		let creator = user::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			wallet_address: Set("0xcreator".into()),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		asset::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			owner_id: Set(creator.id),
			title: Set("work".into()),
			mime_type: Set("image/png".into()),
			file_size: Set(1),
			registered_on_chain: Set(registered),
			story_protocol_id: Set(registered
				.then(|| "0x00000000000000000000000000000000000000aa".to_string())),
			license_terms_id: Set(registered.then_some(2)),
			status: Set(AssetStatus::Registered.into()),
			created_at: Set(Utc::now()),
			updated_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap()
	}

	#[tokio::test]
	async fn activation_uses_full_supply_and_caches_the_vault() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let asset = seed_asset(&db, true).await;

		let fractions = Fractions::new(db.clone());
		let lookup = FixedVault(VaultResolution::Deployed(VAULT.into()));
		let model = fractions.activate(&lookup, asset.id, 0.001).await.unwrap();

		assert_eq!(model.total_supply, ROYALTY_TOKEN_SUPPLY);
		assert_eq!(model.available_supply, ROYALTY_TOKEN_SUPPLY);
		assert_eq!(model.token_address, VAULT);

		let cached = asset::Entity::find_by_id(asset.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(cached.royalty_vault_address.as_deref(), Some(VAULT));
		assert_eq!(cached.status(), AssetStatus::Active);
	}

	#[tokio::test]
	async fn unregistered_asset_cannot_be_fractionalized() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let asset = seed_asset(&db, false).await;

		let fractions = Fractions::new(db.clone());
		let lookup = FixedVault(VaultResolution::Deployed(VAULT.into()));
		let err = fractions.activate(&lookup, asset.id, 0.001).await.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn missing_vault_surfaces_not_yet_deployed() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let asset = seed_asset(&db, true).await;

		let fractions = Fractions::new(db.clone());
		let lookup = FixedVault(VaultResolution::NotYetDeployed);
		let err = fractions.activate(&lookup, asset.id, 0.001).await.unwrap_err();
		assert!(matches!(
			err,
			CoreError::Chain(ChainError::VaultNotDeployed(_))
		));
	}

	#[tokio::test]
	async fn double_activation_conflicts() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let asset = seed_asset(&db, true).await;

		let fractions = Fractions::new(db.clone());
		let lookup = FixedVault(VaultResolution::Deployed(VAULT.into()));
		fractions.activate(&lookup, asset.id, 0.001).await.unwrap();
		let err = fractions.activate(&lookup, asset.id, 0.001).await.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));
	}
}
