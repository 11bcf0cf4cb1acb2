//! Transaction confirmation waiting
//!
//! A submitted transaction cannot be cancelled, only monitored. The wait
//! races a timeout against confirmation; on timeout it signals "still
//! pending" to the caller and keeps waiting for the same transaction.

use crate::common::ChainError;
use ethers::providers::{JsonRpcClient, PendingTransaction};
use ethers::types::{TransactionReceipt, U64};
use std::time::Duration;
use tracing::warn;

/// Await a pending transaction, invoking `on_still_pending` with the number
/// of elapsed budget windows each time `budget` passes without confirmation.
pub async fn wait_for_receipt<P: JsonRpcClient>(
	pending: PendingTransaction<'_, P>,
	budget: Duration,
	mut on_still_pending: impl FnMut(u32),
) -> Result<TransactionReceipt, ChainError> {
	let tx_hash = pending.tx_hash();
	tokio::pin!(pending);

	let mut windows = 0u32;
	let receipt = loop {
		match tokio::time::timeout(budget, &mut pending).await {
			Ok(result) => {
				break result.map_err(|e| ChainError::classify(e.to_string()))?;
			}
			Err(_elapsed) => {
				windows += 1;
				warn!(
					"Transaction {:?} still pending after {} windows of {:?}",
					tx_hash, windows, budget
				);
				on_still_pending(windows);
			}
		}
	};

	let receipt = receipt.ok_or_else(|| {
		ChainError::Transaction(format!("transaction {tx_hash:?} was dropped from the mempool"))
	})?;

	if receipt.status == Some(U64::zero()) {
		return Err(ChainError::Reverted(format!(
			"transaction {:?} reverted on-chain",
			receipt.transaction_hash
		)));
	}

	Ok(receipt)
}
