//! Fraction holder entity
//!
//! (fractionalization, user) → amount. Updated transactionally on every
//! buy/sell; `percentage_owned` is always amount / total_supply * 100.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fraction_holders")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub fractionalization_id: i32,
	pub user_id: i32,
	pub amount: i64,
	pub percentage_owned: f64,
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
		from = "Column::UserId",
		to = "super::user::Column::Id"
	)]
	User,
}

impl Related<super::fractionalization::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Fractionalization.def()
	}
}

impl Related<super::user::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::User.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

/// Ownership percentage for `amount` tokens out of `total_supply`.
pub fn percentage_owned(amount: i64, total_supply: i64) -> f64 {
	if total_supply == 0 {
		return 0.0;
	}
	amount as f64 / total_supply as f64 * 100.0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn percentage_is_amount_over_supply() {
		assert!((percentage_owned(25_000_000, 100_000_000) - 25.0).abs() < 1e-6);
		assert!((percentage_owned(1, 100_000_000) - 0.000001).abs() < 1e-9);
	}

	#[test]
	fn zero_supply_does_not_divide_by_zero() {
		assert_eq!(percentage_owned(10, 0), 0.0);
	}
}
