//! Revenue entity
//!
//! A credit owed to a user from a sale event, claimable later.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "revenues")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub user_id: i32,
	pub order_id: i32,
	pub amount: f64,
	pub source: i32,
	pub claimed: bool,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::UserId",
		to = "super::user::Column::Id"
	)]
	User,
	#[sea_orm(
		belongs_to = "super::order::Entity",
		from = "Column::OrderId",
		to = "super::order::Column::Id"
	)]
	Order,
}

impl Related<super::user::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::User.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevenueSource {
	PrimarySale = 0,
	SecondarySale = 1,
	Royalty = 2,
}

impl From<i32> for RevenueSource {
	fn from(value: i32) -> Self {
		match value {
			1 => RevenueSource::SecondarySale,
			2 => RevenueSource::Royalty,
			_ => RevenueSource::PrimarySale,
		}
	}
}

impl From<RevenueSource> for i32 {
	fn from(source: RevenueSource) -> Self {
		source as i32
	}
}
