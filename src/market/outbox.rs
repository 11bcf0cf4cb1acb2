//! Settlement outbox worker
//!
//! Token transfers queued by settlement are executed here, outside the HTTP
//! request. Each pass picks up due PENDING tasks, runs the transfer across
//! the RPC fallback list, and either completes the order or reschedules the
//! task. Tasks that exhaust their attempts are marked FAILED and the order
//! stays PENDING_TRANSFER for manual reconciliation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use tracing::{error, info, warn};

use crate::chain::tokens::TokenTransfer;
use crate::common::Result;
use crate::infra::db::entities::{order, transfer_task, OrderStatus, TransferTaskStatus};

pub struct OutboxWorker {
	db: DatabaseConnection,
	transfers: Arc<dyn TokenTransfer>,
	poll_interval: Duration,
	max_attempts: i32,
}

impl OutboxWorker {
	pub fn new(
		db: DatabaseConnection,
		transfers: Arc<dyn TokenTransfer>,
		poll_interval: Duration,
		max_attempts: i32,
	) -> Self {
		Self {
			db,
			transfers,
			poll_interval,
			max_attempts,
		}
	}

	/// Run forever. Intended to be spawned alongside the server.
	pub async fn run(self) {
		info!(
			poll_secs = self.poll_interval.as_secs(),
			"outbox worker started"
		);
		loop {
			if let Err(e) = self.tick().await {
				error!("outbox pass failed: {e}");
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}

	/// One worker pass. Returns how many tasks were attempted.
	pub async fn tick(&self) -> Result<usize> {
		let due = transfer_task::Entity::find()
			.filter(transfer_task::Column::Status.eq(i32::from(TransferTaskStatus::Pending)))
			.filter(transfer_task::Column::NextAttemptAt.lte(Utc::now()))
			.all(&self.db)
			.await?;

		let count = due.len();
		for task in due {
			let order_id = task.order_id;
			if let Err(e) = self.process(task).await {
				error!(order_id, "outbox task pass failed: {e}");
			}
		}
		Ok(count)
	}

	async fn process(&self, task: transfer_task::Model) -> Result<()> {
		let attempt = task.attempts + 1;
		let mut active: transfer_task::ActiveModel = task.clone().into();
		active.status = Set(TransferTaskStatus::InProgress.into());
		active.attempts = Set(attempt);
		active.updated_at = Set(Utc::now());
		let in_progress = active.update(&self.db).await?;

		match self
			.transfers
			.transfer(&task.token_address, &task.recipient, task.amount as u64)
			.await
		{
			Ok(tx_hash) => {
				info!(
					order_id = task.order_id,
					tx_hash, "outbox transfer confirmed"
				);
				let mut done: transfer_task::ActiveModel = in_progress.into();
				done.status = Set(TransferTaskStatus::Completed.into());
				done.last_error = Set(None);
				done.updated_at = Set(Utc::now());
				done.update(&self.db).await?;

				self.complete_order(task.order_id, &tx_hash).await?;
			}
			Err(e) => {
				let exhausted = attempt >= self.max_attempts;
				warn!(
					order_id = task.order_id,
					attempt, exhausted, "outbox transfer failed: {e}"
				);
				let mut failed: transfer_task::ActiveModel = in_progress.into();
				failed.last_error = Set(Some(e.to_string()));
				failed.updated_at = Set(Utc::now());
				if exhausted {
					failed.status = Set(TransferTaskStatus::Failed.into());
				} else {
					failed.status = Set(TransferTaskStatus::Pending.into());
					failed.next_attempt_at = Set(Utc::now()
						+ chrono::Duration::from_std(self.poll_interval * attempt as u32)
							.unwrap_or_else(|_| chrono::Duration::seconds(30)));
				}
				failed.update(&self.db).await?;
			}
		}
		Ok(())
	}

	async fn complete_order(&self, order_id: i32, tx_hash: &str) -> Result<()> {
		if let Some(order) = order::Entity::find_by_id(order_id).one(&self.db).await? {
			let mut active: order::ActiveModel = order.into();
			active.status = Set(OrderStatus::Completed.into());
			active.transfer_tx_hash = Set(Some(tx_hash.to_string()));
			active.updated_at = Set(Utc::now());
			active.update(&self.db).await?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use pretty_assertions::assert_eq;
	use sea_orm::prelude::Uuid;

	use super::*;
	use crate::common::ChainError;
	use crate::infra::db::entities::{
		asset, fractionalization, user, FractionalizationStatus, OrderKind, ROYALTY_TOKEN_SUPPLY,
	};
	use crate::infra::db::entities::asset::AssetStatus;

	struct ScriptedTransfer {
		fail_first: usize,
		calls: AtomicUsize,
	}

	#[async_trait]
	impl TokenTransfer for ScriptedTransfer {
		async fn transfer(
			&self,
			_token_address: &str,
			_to: &str,
			_amount: u64,
		) -> std::result::Result<String, ChainError> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst);
			if call < self.fail_first {
				Err(ChainError::Rpc("connection reset".into()))
			} else {
				Ok("0xtransfer".into())
			}
		}
	}

	async fn seed_order(
		db: &DatabaseConnection,
		wallet: &str,
	) -> (order::Model, transfer_task::Model) {
		let now = Utc::now();
		let creator = user::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			wallet_address: Set(wallet.into()),
			created_at: Set(now),
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
			created_at: Set(now),
			updated_at: Set(now),
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
			created_at: Set(now),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		let order = order::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			fractionalization_id: Set(fractionalization.id),
			buyer_id: Set(creator.id),
			amount: Set(100),
			price_per_token: Set(0.001),
			total_price: Set(0.1),
			payment_tx_hash: Set("0xpay".into()),
			kind: Set(OrderKind::Primary.into()),
			status: Set(OrderStatus::PendingTransfer.into()),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		let task = transfer_task::ActiveModel {
			order_id: Set(order.id),
			token_address: Set("0x00000000000000000000000000000000000000dd".into()),
			recipient: Set("0xbuyer".into()),
			amount: Set(100),
			status: Set(TransferTaskStatus::Pending.into()),
			attempts: Set(0),
			next_attempt_at: Set(now),
			created_at: Set(now),
			updated_at: Set(now),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		(order, task)
	}

	fn worker(db: &DatabaseConnection, transfers: Arc<dyn TokenTransfer>) -> OutboxWorker {
		OutboxWorker::new(db.clone(), transfers, Duration::from_secs(30), 3)
	}

	#[tokio::test]
	async fn successful_transfer_completes_the_order() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (order, task) = seed_order(&db, "0xcreator").await;

		let w = worker(
			&db,
			Arc::new(ScriptedTransfer {
				fail_first: 0,
				calls: AtomicUsize::new(0),
			}),
		);
		assert_eq!(w.tick().await.unwrap(), 1);

		let task = transfer_task::Entity::find_by_id(task.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(
			TransferTaskStatus::from(task.status),
			TransferTaskStatus::Completed
		);

		let order = order::Entity::find_by_id(order.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(OrderStatus::from(order.status), OrderStatus::Completed);
		assert_eq!(order.transfer_tx_hash.as_deref(), Some("0xtransfer"));
	}

	#[tokio::test]
	async fn failed_transfer_reschedules_with_backoff() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (order, task) = seed_order(&db, "0xcreator").await;

		let w = worker(
			&db,
			Arc::new(ScriptedTransfer {
				fail_first: 1,
				calls: AtomicUsize::new(0),
			}),
		);
		w.tick().await.unwrap();

		let task = transfer_task::Entity::find_by_id(task.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(
			TransferTaskStatus::from(task.status),
			TransferTaskStatus::Pending
		);
		assert_eq!(task.attempts, 1);
		assert!(task.last_error.is_some());
		assert!(task.next_attempt_at > Utc::now());

		// Order surfaces the eventual-consistency window.
		let order = order::Entity::find_by_id(order.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(
			OrderStatus::from(order.status),
			OrderStatus::PendingTransfer
		);
	}

	#[tokio::test]
	async fn exhausted_attempts_mark_the_task_failed() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (order, task) = seed_order(&db, "0xcreator").await;

		let transfers = Arc::new(ScriptedTransfer {
			fail_first: usize::MAX,
			calls: AtomicUsize::new(0),
		});
		let w = worker(&db, transfers);

		for _ in 0..3 {
			// Force the task due again regardless of backoff.
			let row = transfer_task::Entity::find_by_id(task.id)
				.one(&db)
				.await
				.unwrap()
				.unwrap();
			let mut active: transfer_task::ActiveModel = row.into();
			active.next_attempt_at = Set(Utc::now() - chrono::Duration::seconds(1));
			active.update(&db).await.unwrap();
			w.tick().await.unwrap();
		}

		let task = transfer_task::Entity::find_by_id(task.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(
			TransferTaskStatus::from(task.status),
			TransferTaskStatus::Failed
		);
		assert_eq!(task.attempts, 3);

		let order = order::Entity::find_by_id(order.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(
			OrderStatus::from(order.status),
			OrderStatus::PendingTransfer
		);
	}

	#[tokio::test]
	async fn one_failing_task_does_not_block_the_pass() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let (_, first) = seed_order(&db, "0xcreator").await;
		let (second_order, second) = seed_order(&db, "0xother").await;

		// First transfer fails, second succeeds within the same pass.
		let w = worker(
			&db,
			Arc::new(ScriptedTransfer {
				fail_first: 1,
				calls: AtomicUsize::new(0),
			}),
		);
		assert_eq!(w.tick().await.unwrap(), 2);

		let first = transfer_task::Entity::find_by_id(first.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(
			TransferTaskStatus::from(first.status),
			TransferTaskStatus::Pending
		);
		assert_eq!(first.attempts, 1);

		let second = transfer_task::Entity::find_by_id(second.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(
			TransferTaskStatus::from(second.status),
			TransferTaskStatus::Completed
		);
		assert_eq!(second.attempts, 1);

		let order = order::Entity::find_by_id(second_order.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(OrderStatus::from(order.status), OrderStatus::Completed);
	}
}
