//! Asset entity
//!
//! One row per creative work. Nullable columns double as pipeline evidence:
//! each upload/registration step leaves its pointers behind, and the
//! recovery diagnosis reads them back to find where a run stopped. Rows are
//! archived, never deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub uuid: Uuid,
	pub owner_id: i32,
	pub title: String,
	pub description: Option<String>,
	pub mime_type: String,
	pub file_size: i64,

	// Content identity
	pub content_hash: Option<String>,
	pub watermark_id: Option<String>,

	// Storage pointers
	pub pinata_cid: Option<String>,
	pub pinata_url: Option<String>,
	pub thumbnail_cid: Option<String>,
	pub thumbnail_url: Option<String>,
	pub metadata_hash: Option<String>,
	pub metadata_cid: Option<String>,
	pub metadata_url: Option<String>,

	// DippChain registry pointers
	pub dippchain_token_id: Option<i64>,
	pub dippchain_tx_hash: Option<String>,
	pub registered_on_chain: bool,

	// IP protocol pointers
	pub story_protocol_id: Option<String>,
	pub story_protocol_tx_hash: Option<String>,
	pub story_nft_token_id: Option<i64>,
	pub story_nft_contract: Option<String>,
	pub license_terms_id: Option<i64>,
	pub royalty_vault_address: Option<String>,

	pub status: i32,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::OwnerId",
		to = "super::user::Column::Id"
	)]
	Owner,
	#[sea_orm(has_one = "super::fractionalization::Entity")]
	Fractionalization,
}

impl Related<super::user::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Owner.def()
	}
}

impl Related<super::fractionalization::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Fractionalization.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

/// Asset lifecycle. Forward-only: DRAFT → PROCESSING → REGISTERED → ACTIVE
/// → ARCHIVED.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetStatus {
	Draft = 0,
	Processing = 1,
	Registered = 2,
	Active = 3,
	Archived = 4,
}

impl From<i32> for AssetStatus {
	fn from(value: i32) -> Self {
		match value {
			1 => AssetStatus::Processing,
			2 => AssetStatus::Registered,
			3 => AssetStatus::Active,
			4 => AssetStatus::Archived,
			_ => AssetStatus::Draft,
		}
	}
}

impl From<AssetStatus> for i32 {
	fn from(status: AssetStatus) -> Self {
		status as i32
	}
}

impl Model {
	pub fn status(&self) -> AssetStatus {
		AssetStatus::from(self.status)
	}

	/// An asset may only reach REGISTERED once content identity, storage
	/// pointers and the IP protocol id are all present.
	pub fn registration_complete(&self) -> bool {
		self.content_hash.is_some()
			&& self.pinata_cid.is_some()
			&& self.pinata_url.is_some()
			&& self.story_protocol_id.is_some()
	}

	/// A non-DRAFT asset with missing evidence is in a partial-failure
	/// state and needs diagnosis.
	pub fn needs_diagnosis(&self) -> bool {
		self.status() != AssetStatus::Draft && !self.registration_complete()
	}
}
