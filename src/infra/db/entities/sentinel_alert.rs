//! Sentinel alert entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sentinel_alerts")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub scan_id: i32,
	/// The asset being protected
	pub asset_id: i32,
	/// The asset it matched against
	pub matched_asset_id: i32,
	pub similarity: f64,
	pub watermark_match: bool,
	pub severity: i32,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::sentinel_scan::Entity",
		from = "Column::ScanId",
		to = "super::sentinel_scan::Column::Id"
	)]
	Scan,
}

impl Related<super::sentinel_scan::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Scan.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
	Low = 0,
	Medium = 1,
	High = 2,
	Critical = 3,
}

impl From<i32> for Severity {
	fn from(value: i32) -> Self {
		match value {
			1 => Severity::Medium,
			2 => Severity::High,
			3 => Severity::Critical,
			_ => Severity::Low,
		}
	}
}

impl From<Severity> for i32 {
	fn from(severity: Severity) -> Self {
		severity as i32
	}
}
