//! Sentinel scan entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sentinel_scans")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub asset_id: i32,
	pub status: i32,
	pub matches_found: i32,
	pub started_at: DateTimeUtc,
	pub finished_at: Option<DateTimeUtc>,
	pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::asset::Entity",
		from = "Column::AssetId",
		to = "super::asset::Column::Id"
	)]
	Asset,
	#[sea_orm(has_many = "super::sentinel_alert::Entity")]
	Alerts,
}

impl Related<super::sentinel_alert::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Alerts.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
	Pending = 0,
	Running = 1,
	Completed = 2,
	Failed = 3,
}

impl From<i32> for ScanStatus {
	fn from(value: i32) -> Self {
		match value {
			1 => ScanStatus::Running,
			2 => ScanStatus::Completed,
			3 => ScanStatus::Failed,
			_ => ScanStatus::Pending,
		}
	}
}

impl From<ScanStatus> for i32 {
	fn from(status: ScanStatus) -> Self {
		status as i32
	}
}
