//! User entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub uuid: Uuid,
	#[sea_orm(unique)]
	pub wallet_address: String,
	pub display_name: Option<String>,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::asset::Entity")]
	Asset,
	#[sea_orm(has_many = "super::fraction_holder::Entity")]
	FractionHolder,
}

impl Related<super::asset::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Asset.def()
	}
}

impl Related<super::fraction_holder::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::FractionHolder.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
