//! Marketplace listing entity
//!
//! Secondary-market (peer-to-peer) sale offers for fraction tokens.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "marketplace_listings")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub fractionalization_id: i32,
	pub seller_id: i32,
	pub amount: i64,
	pub remaining: i64,
	pub price_per_token: f64,
	pub status: i32,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::fractionalization::Entity",
		from = "Column::FractionalizationId",
		to = "super::fractionalization::Column::Id"
	)]
	Fractionalization,
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::SellerId",
		to = "super::user::Column::Id"
	)]
	Seller,
}

impl Related<super::fractionalization::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Fractionalization.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
	Active = 0,
	Filled = 1,
	Cancelled = 2,
}

impl From<i32> for ListingStatus {
	fn from(value: i32) -> Self {
		match value {
			1 => ListingStatus::Filled,
			2 => ListingStatus::Cancelled,
			_ => ListingStatus::Active,
		}
	}
}

impl From<ListingStatus> for i32 {
	fn from(status: ListingStatus) -> Self {
		status as i32
	}
}
