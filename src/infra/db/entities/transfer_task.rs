//! Transfer task entity (settlement outbox)
//!
//! Post-commit token transfers are written here inside the settlement
//! transaction, then executed by the outbox worker. A crash leaves the row
//! PENDING for the next worker pass instead of losing the transfer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_tasks")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub order_id: i32,
	pub token_address: String,
	pub recipient: String,
	pub amount: i64,
	pub status: i32,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub next_attempt_at: DateTimeUtc,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::order::Entity",
		from = "Column::OrderId",
		to = "super::order::Column::Id"
	)]
	Order,
}

impl Related<super::order::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Order.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferTaskStatus {
	Pending = 0,
	InProgress = 1,
	Completed = 2,
	Failed = 3,
}

impl From<i32> for TransferTaskStatus {
	fn from(value: i32) -> Self {
		match value {
			1 => TransferTaskStatus::InProgress,
			2 => TransferTaskStatus::Completed,
			3 => TransferTaskStatus::Failed,
			_ => TransferTaskStatus::Pending,
		}
	}
}

impl From<TransferTaskStatus> for i32 {
	fn from(status: TransferTaskStatus) -> Self {
		status as i32
	}
}
