//! Order entity
//!
//! One row per primary or secondary token purchase. The status field
//! surfaces the eventual-consistency window: the payment and the database
//! commit land before the token transfer does, so orders sit in
//! PENDING_TRANSFER until the outbox worker confirms the on-chain move.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub uuid: Uuid,
	pub fractionalization_id: i32,
	/// Secondary-market orders reference the listing they filled
	pub listing_id: Option<i32>,
	pub buyer_id: i32,
	pub seller_id: Option<i32>,
	pub amount: i64,
	pub price_per_token: f64,
	pub total_price: f64,
	/// The buyer's payment transaction
	pub payment_tx_hash: String,
	/// The token transfer executed by the outbox worker
	pub transfer_tx_hash: Option<String>,
	pub kind: i32,
	pub status: i32,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
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
		from = "Column::BuyerId",
		to = "super::user::Column::Id"
	)]
	Buyer,
}

impl Related<super::fractionalization::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Fractionalization.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
	Primary = 0,
	Secondary = 1,
}

impl From<i32> for OrderKind {
	fn from(value: i32) -> Self {
		match value {
			1 => OrderKind::Secondary,
			_ => OrderKind::Primary,
		}
	}
}

impl From<OrderKind> for i32 {
	fn from(kind: OrderKind) -> Self {
		kind as i32
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
	PendingTransfer = 0,
	Completed = 1,
	Failed = 2,
}

impl From<i32> for OrderStatus {
	fn from(value: i32) -> Self {
		match value {
			1 => OrderStatus::Completed,
			2 => OrderStatus::Failed,
			_ => OrderStatus::PendingTransfer,
		}
	}
}

impl From<OrderStatus> for i32 {
	fn from(status: OrderStatus) -> Self {
		status as i32
	}
}
