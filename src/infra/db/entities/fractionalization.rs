//! Fractionalization entity
//!
//! A 1:1 mapping from a registered asset to its royalty-token sale
//! configuration. The total supply is fixed at the protocol's native
//! royalty-token supply.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The protocol mints exactly this many royalty tokens per vault.
pub const ROYALTY_TOKEN_SUPPLY: i64 = 100_000_000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fractionalizations")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub asset_id: i32,
	pub total_supply: i64,
	pub available_supply: i64,
	pub price_per_token: f64,
	/// The vault's ERC-20-like contract
	pub token_address: String,
	pub status: i32,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::asset::Entity",
		from = "Column::AssetId",
		to = "super::asset::Column::Id"
	)]
	Asset,
	#[sea_orm(has_many = "super::fraction_holder::Entity")]
	Holders,
}

impl Related<super::asset::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Asset.def()
	}
}

impl Related<super::fraction_holder::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Holders.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FractionalizationStatus {
	Deployed = 0,
	Trading = 1,
	Paused = 2,
}

impl From<i32> for FractionalizationStatus {
	fn from(value: i32) -> Self {
		match value {
			1 => FractionalizationStatus::Trading,
			2 => FractionalizationStatus::Paused,
			_ => FractionalizationStatus::Deployed,
		}
	}
}

impl From<FractionalizationStatus> for i32 {
	fn from(status: FractionalizationStatus) -> Self {
		status as i32
	}
}
