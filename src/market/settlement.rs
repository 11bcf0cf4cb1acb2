//! Marketplace settlement
//!
//! Buys are two-phase. The buyer has already paid on-chain and hands us the
//! payment transaction hash; we then commit supply, holder, order and revenue
//! rows atomically, enqueue the token transfer in the outbox and return
//! immediately. The token move itself happens later, so a fresh order always
//! reads PENDING_TRANSFER.

use std::time::Duration;

use chrono::Utc;
use sea_orm::prelude::Uuid;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
	EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::info;

use crate::common::{CoreError, Result};
use crate::infra::db::entities::{
	asset, fraction_holder, fractionalization, marketplace_listing, order, revenue, transfer_task,
	user, ListingStatus, OrderKind, OrderStatus, RevenueSource, TransferTaskStatus,
};

#[derive(Debug, Clone)]
pub struct PrimaryBuy {
	pub fractionalization_id: i32,
	pub buyer_address: String,
	pub amount: i64,
	pub payment_tx_hash: String,
}

#[derive(Debug, Clone)]
pub struct SecondaryBuy {
	pub listing_id: i32,
	pub buyer_address: String,
	pub amount: i64,
	pub payment_tx_hash: String,
}

#[derive(Debug)]
pub struct SettlementOutcome {
	pub order: order::Model,
	/// Always true for a fresh order; the outbox completes the transfer.
	pub transfer_in_progress: bool,
}

pub struct Settlement {
	db: DatabaseConnection,
	/// Budget for the whole database transaction, bounding lock contention.
	transaction_budget: Duration,
}

impl Settlement {
	pub fn new(db: DatabaseConnection, transaction_budget: Duration) -> Self {
		Self {
			db,
			transaction_budget,
		}
	}

	/// Buy from the creator's initial supply.
	pub async fn buy_primary(&self, buy: PrimaryBuy) -> Result<SettlementOutcome> {
		validate_buy(buy.amount, &buy.payment_tx_hash, &buy.buyer_address)?;
		let buyer_address = normalize_address(&buy.buyer_address);

		let fractionalization = fractionalization::Entity::find_by_id(buy.fractionalization_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| {
				CoreError::NotFound(format!("fractionalization {}", buy.fractionalization_id))
			})?;
		let asset = asset::Entity::find_by_id(fractionalization.asset_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("asset {}", fractionalization.asset_id)))?;
		let creator = user::Entity::find_by_id(asset.owner_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("user {}", asset.owner_id)))?;

		// Self-purchase check happens before anything is written.
		if creator.wallet_address.eq_ignore_ascii_case(&buyer_address) {
			return Err(CoreError::Conflict(
				"creator cannot buy their own primary supply".into(),
			));
		}
		if fractionalization.available_supply < buy.amount {
			return Err(CoreError::Conflict(format!(
				"only {} tokens available",
				fractionalization.available_supply
			)));
		}

		let buyer = self.find_or_create_user(&buyer_address).await?;
		let total_price = buy.amount as f64 * fractionalization.price_per_token;

		let txn_work = async {
			let txn = self.db.begin().await?;

			let mut active: fractionalization::ActiveModel = fractionalization.clone().into();
			active.available_supply = Set(fractionalization.available_supply - buy.amount);
			active.update(&txn).await?;

			credit_holder(
				&txn,
				fractionalization.id,
				buyer.id,
				buy.amount,
				fractionalization.total_supply,
			)
			.await?;

			let order = order::ActiveModel {
				uuid: Set(Uuid::new_v4()),
				fractionalization_id: Set(fractionalization.id),
				listing_id: Set(None),
				buyer_id: Set(buyer.id),
				seller_id: Set(Some(creator.id)),
				amount: Set(buy.amount),
				price_per_token: Set(fractionalization.price_per_token),
				total_price: Set(total_price),
				payment_tx_hash: Set(buy.payment_tx_hash.clone()),
				kind: Set(OrderKind::Primary.into()),
				status: Set(OrderStatus::PendingTransfer.into()),
				created_at: Set(Utc::now()),
				updated_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(&txn)
			.await?;

			revenue::ActiveModel {
				user_id: Set(creator.id),
				order_id: Set(order.id),
				amount: Set(total_price),
				source: Set(RevenueSource::PrimarySale.into()),
				claimed: Set(false),
				created_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(&txn)
			.await?;

			enqueue_transfer(
				&txn,
				order.id,
				&fractionalization.token_address,
				&buyer_address,
				buy.amount,
			)
			.await?;

			txn.commit().await?;
			Ok::<_, CoreError>(order)
		};

		let order = tokio::time::timeout(self.transaction_budget, txn_work)
			.await
			.map_err(|_| CoreError::Timeout(self.transaction_budget.as_secs()))??;

		info!(order_id = order.id, "primary buy settled, transfer queued");
		Ok(SettlementOutcome {
			order,
			transfer_in_progress: true,
		})
	}

	/// Buy from another holder's listing.
	pub async fn buy_secondary(&self, buy: SecondaryBuy) -> Result<SettlementOutcome> {
		validate_buy(buy.amount, &buy.payment_tx_hash, &buy.buyer_address)?;
		let buyer_address = normalize_address(&buy.buyer_address);

		let listing = marketplace_listing::Entity::find_by_id(buy.listing_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("listing {}", buy.listing_id)))?;
		if ListingStatus::from(listing.status) != ListingStatus::Active {
			return Err(CoreError::Conflict("listing is not active".into()));
		}
		let fractionalization = fractionalization::Entity::find_by_id(listing.fractionalization_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| {
				CoreError::NotFound(format!("fractionalization {}", listing.fractionalization_id))
			})?;
		let seller = user::Entity::find_by_id(listing.seller_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("user {}", listing.seller_id)))?;

		if seller.wallet_address.eq_ignore_ascii_case(&buyer_address) {
			return Err(CoreError::Conflict(
				"seller cannot buy their own listing".into(),
			));
		}
		if listing.remaining < buy.amount {
			return Err(CoreError::Conflict(format!(
				"only {} tokens remain on this listing",
				listing.remaining
			)));
		}

		let buyer = self.find_or_create_user(&buyer_address).await?;
		let total_price = buy.amount as f64 * listing.price_per_token;

		let txn_work = async {
			let txn = self.db.begin().await?;

			let remaining = listing.remaining - buy.amount;
			let mut active: marketplace_listing::ActiveModel = listing.clone().into();
			active.remaining = Set(remaining);
			if remaining == 0 {
				active.status = Set(ListingStatus::Filled.into());
			}
			active.update(&txn).await?;

			debit_holder(
				&txn,
				fractionalization.id,
				seller.id,
				buy.amount,
				fractionalization.total_supply,
			)
			.await?;
			credit_holder(
				&txn,
				fractionalization.id,
				buyer.id,
				buy.amount,
				fractionalization.total_supply,
			)
			.await?;

			let order = order::ActiveModel {
				uuid: Set(Uuid::new_v4()),
				fractionalization_id: Set(fractionalization.id),
				listing_id: Set(Some(listing.id)),
				buyer_id: Set(buyer.id),
				seller_id: Set(Some(seller.id)),
				amount: Set(buy.amount),
				price_per_token: Set(listing.price_per_token),
				total_price: Set(total_price),
				payment_tx_hash: Set(buy.payment_tx_hash.clone()),
				kind: Set(OrderKind::Secondary.into()),
				status: Set(OrderStatus::PendingTransfer.into()),
				created_at: Set(Utc::now()),
				updated_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(&txn)
			.await?;

			revenue::ActiveModel {
				user_id: Set(seller.id),
				order_id: Set(order.id),
				amount: Set(total_price),
				source: Set(RevenueSource::SecondarySale.into()),
				claimed: Set(false),
				created_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(&txn)
			.await?;

			enqueue_transfer(
				&txn,
				order.id,
				&fractionalization.token_address,
				&buyer_address,
				buy.amount,
			)
			.await?;

			txn.commit().await?;
			Ok::<_, CoreError>(order)
		};

		let order = tokio::time::timeout(self.transaction_budget, txn_work)
			.await
			.map_err(|_| CoreError::Timeout(self.transaction_budget.as_secs()))??;

		info!(order_id = order.id, "secondary buy settled, transfer queued");
		Ok(SettlementOutcome {
			order,
			transfer_in_progress: true,
		})
	}

	async fn find_or_create_user(&self, wallet_address: &str) -> Result<user::Model> {
		if let Some(found) = user::Entity::find()
			.filter(user::Column::WalletAddress.eq(wallet_address))
			.one(&self.db)
			.await?
		{
			return Ok(found);
		}
		Ok(user::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			wallet_address: Set(wallet_address.to_string()),
			display_name: Set(None),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(&self.db)
		.await?)
	}
}

fn validate_buy(amount: i64, payment_tx_hash: &str, buyer_address: &str) -> Result<()> {
	if amount <= 0 {
		return Err(CoreError::Validation("amount must be positive".into()));
	}
	if payment_tx_hash.trim().is_empty() {
		return Err(CoreError::Validation("payment transaction hash is required".into()));
	}
	if buyer_address.trim().is_empty() {
		return Err(CoreError::Validation("buyer address is required".into()));
	}
	Ok(())
}

/// Wallet addresses are stored and compared lowercased.
pub fn normalize_address(address: &str) -> String {
	address.trim().to_ascii_lowercase()
}

async fn credit_holder(
	txn: &DatabaseTransaction,
	fractionalization_id: i32,
	user_id: i32,
	amount: i64,
	total_supply: i64,
) -> Result<()> {
	let existing = fraction_holder::Entity::find()
		.filter(fraction_holder::Column::FractionalizationId.eq(fractionalization_id))
		.filter(fraction_holder::Column::UserId.eq(user_id))
		.one(txn)
		.await?;

	match existing {
		Some(holder) => {
			let new_amount = holder.amount + amount;
			let mut active: fraction_holder::ActiveModel = holder.into();
			active.amount = Set(new_amount);
			active.percentage_owned =
				Set(fraction_holder::percentage_owned(new_amount, total_supply));
			active.updated_at = Set(Utc::now());
			active.update(txn).await?;
		}
		None => {
			fraction_holder::ActiveModel {
				fractionalization_id: Set(fractionalization_id),
				user_id: Set(user_id),
				amount: Set(amount),
				percentage_owned: Set(fraction_holder::percentage_owned(amount, total_supply)),
				updated_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(txn)
			.await?;
		}
	}
	Ok(())
}

async fn debit_holder(
	txn: &DatabaseTransaction,
	fractionalization_id: i32,
	user_id: i32,
	amount: i64,
	total_supply: i64,
) -> Result<()> {
	let holder = fraction_holder::Entity::find()
		.filter(fraction_holder::Column::FractionalizationId.eq(fractionalization_id))
		.filter(fraction_holder::Column::UserId.eq(user_id))
		.one(txn)
		.await?
		.ok_or_else(|| CoreError::Conflict("seller holds no tokens".into()))?;

	if holder.amount < amount {
		return Err(CoreError::Conflict(format!(
			"seller holds only {} tokens",
			holder.amount
		)));
	}
	let new_amount = holder.amount - amount;
	let mut active: fraction_holder::ActiveModel = holder.into();
	active.amount = Set(new_amount);
	active.percentage_owned = Set(fraction_holder::percentage_owned(new_amount, total_supply));
	active.updated_at = Set(Utc::now());
	active.update(txn).await?;
	Ok(())
}

async fn enqueue_transfer(
	txn: &DatabaseTransaction,
	order_id: i32,
	token_address: &str,
	recipient: &str,
	amount: i64,
) -> Result<()> {
	transfer_task::ActiveModel {
		order_id: Set(order_id),
		token_address: Set(token_address.to_string()),
		recipient: Set(recipient.to_string()),
		amount: Set(amount),
		status: Set(TransferTaskStatus::Pending.into()),
		attempts: Set(0),
		last_error: Set(None),
		next_attempt_at: Set(Utc::now()),
		created_at: Set(Utc::now()),
		updated_at: Set(Utc::now()),
		..Default::default()
	}
	.insert(txn)
	.await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::infra::db::entities::{FractionalizationStatus, ROYALTY_TOKEN_SUPPLY};
	use crate::infra::db::entities::asset::AssetStatus;

	async fn seed(db: &DatabaseConnection) -> (user::Model, fractionalization::Model) {
		let creator = user::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			wallet_address: Set("0xcreator".into()),
			display_name: Set(Some("creator".into())),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		let asset = asset::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			owner_id: Set(creator.id),
			title: Set("work".into()),
			mime_type: Set("image/png".into()),
			file_size: Set(1),
			registered_on_chain: Set(true),
			status: Set(AssetStatus::Registered.into()),
			created_at: Set(Utc::now()),
			updated_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		let fractionalization = fractionalization::ActiveModel {
			asset_id: Set(asset.id),
			total_supply: Set(ROYALTY_TOKEN_SUPPLY),
			available_supply: Set(ROYALTY_TOKEN_SUPPLY),
			price_per_token: Set(0.001),
			token_address: Set("0x00000000000000000000000000000000000000dd".into()),
			status: Set(FractionalizationStatus::Trading.into()),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		(creator, fractionalization)
	}

	fn settlement(db: &DatabaseConnection) -> Settlement {
		Settlement::new(db.clone(), Duration::from_secs(15))
	}

	#[tokio::test]
	async fn primary_buy_updates_supply_holder_order_revenue_and_outbox() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (creator, fractionalization) = seed(&db).await;

		let outcome = settlement(&db)
			.buy_primary(PrimaryBuy {
				fractionalization_id: fractionalization.id,
				buyer_address: "0xBuYeR".into(),
				amount: 25_000_000,
				payment_tx_hash: "0xpay".into(),
			})
			.await
			.unwrap();

		assert!(outcome.transfer_in_progress);
		assert_eq!(
			OrderStatus::from(outcome.order.status),
			OrderStatus::PendingTransfer
		);
		assert_eq!(outcome.order.seller_id, Some(creator.id));

		let updated = fractionalization::Entity::find_by_id(fractionalization.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(updated.available_supply, ROYALTY_TOKEN_SUPPLY - 25_000_000);

		let holder = fraction_holder::Entity::find()
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(holder.amount, 25_000_000);
		assert!((holder.percentage_owned - 25.0).abs() < 1e-6);

		let task = transfer_task::Entity::find().one(&db).await.unwrap().unwrap();
		assert_eq!(task.order_id, outcome.order.id);
		assert_eq!(task.recipient, "0xbuyer");
		assert_eq!(
			TransferTaskStatus::from(task.status),
			TransferTaskStatus::Pending
		);

		let credit = revenue::Entity::find().one(&db).await.unwrap().unwrap();
		assert_eq!(credit.user_id, creator.id);
		assert!((credit.amount - 25_000.0).abs() < 1e-6);
	}

	#[tokio::test]
	async fn self_purchase_is_rejected_before_any_write() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (_creator, fractionalization) = seed(&db).await;

		// Different casing must still match.
		let err = settlement(&db)
			.buy_primary(PrimaryBuy {
				fractionalization_id: fractionalization.id,
				buyer_address: "0xCREATOR".into(),
				amount: 10,
				payment_tx_hash: "0xpay".into(),
			})
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));

		let untouched = fractionalization::Entity::find_by_id(fractionalization.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(untouched.available_supply, ROYALTY_TOKEN_SUPPLY);
		assert!(order::Entity::find().all(&db).await.unwrap().is_empty());
		assert!(transfer_task::Entity::find().all(&db).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn oversubscribed_primary_buy_conflicts() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (_creator, fractionalization) = seed(&db).await;

		let err = settlement(&db)
			.buy_primary(PrimaryBuy {
				fractionalization_id: fractionalization.id,
				buyer_address: "0xbuyer".into(),
				amount: ROYALTY_TOKEN_SUPPLY + 1,
				payment_tx_hash: "0xpay".into(),
			})
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn secondary_buy_moves_tokens_between_holders() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (_creator, fractionalization) = seed(&db).await;

		// Seller acquires primary tokens first.
		let outcome = settlement(&db)
			.buy_primary(PrimaryBuy {
				fractionalization_id: fractionalization.id,
				buyer_address: "0xseller".into(),
				amount: 10_000_000,
				payment_tx_hash: "0xpay1".into(),
			})
			.await
			.unwrap();
		let seller_id = outcome.order.buyer_id;

		let listing = marketplace_listing::ActiveModel {
			fractionalization_id: Set(fractionalization.id),
			seller_id: Set(seller_id),
			amount: Set(4_000_000),
			remaining: Set(4_000_000),
			price_per_token: Set(0.002),
			status: Set(ListingStatus::Active.into()),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(&db)
		.await
		.unwrap();

		let outcome = settlement(&db)
			.buy_secondary(SecondaryBuy {
				listing_id: listing.id,
				buyer_address: "0xother".into(),
				amount: 4_000_000,
				payment_tx_hash: "0xpay2".into(),
			})
			.await
			.unwrap();
		assert_eq!(OrderKind::from(outcome.order.kind), OrderKind::Secondary);
		assert_eq!(outcome.order.listing_id, Some(listing.id));

		let filled = marketplace_listing::Entity::find_by_id(listing.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(filled.remaining, 0);
		assert_eq!(ListingStatus::from(filled.status), ListingStatus::Filled);

		let seller_holding = fraction_holder::Entity::find()
			.filter(fraction_holder::Column::UserId.eq(seller_id))
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(seller_holding.amount, 6_000_000);

		let buyer_holding = fraction_holder::Entity::find()
			.filter(fraction_holder::Column::UserId.eq(outcome.order.buyer_id))
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(buyer_holding.amount, 4_000_000);
		// Percentages always sum over holders to sold supply / total.
		assert!(
			(seller_holding.percentage_owned + buyer_holding.percentage_owned - 10.0).abs() < 1e-6
		);
	}

	#[tokio::test]
	async fn zero_amount_is_a_validation_error() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (_creator, fractionalization) = seed(&db).await;

		let err = settlement(&db)
			.buy_primary(PrimaryBuy {
				fractionalization_id: fractionalization.id,
				buyer_address: "0xbuyer".into(),
				amount: 0,
				payment_tx_hash: "0xpay".into(),
			})
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Validation(_)));
	}
}
