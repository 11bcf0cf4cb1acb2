//! First-success-wins extraction strategies
//!
//! The same "try A, else B, else C" shape shows up wherever a value has to
//! be recovered from inconsistent on-chain evidence (token ids from receipt
//! logs, vault addresses from mint events). Strategies are named so the log
//! trail records which one produced the value.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use tracing::debug;

/// A named extraction attempt. The future is lazy - nothing runs until the
/// strategy's turn comes up.
pub struct NamedStrategy<'a, T> {
	name: &'static str,
	fut: BoxFuture<'a, Option<T>>,
}

impl<'a, T> NamedStrategy<'a, T> {
	pub fn new(name: &'static str, fut: impl Future<Output = Option<T>> + Send + 'a) -> Self {
		Self {
			name,
			fut: fut.boxed(),
		}
	}
}

/// A value together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<T> {
	pub strategy: &'static str,
	pub value: T,
}

/// Run strategies in order, returning the first `Some`.
pub async fn first_success<T>(strategies: Vec<NamedStrategy<'_, T>>) -> Option<Extracted<T>> {
	for strategy in strategies {
		match strategy.fut.await {
			Some(value) => {
				debug!("Extraction strategy '{}' succeeded", strategy.name);
				return Some(Extracted {
					strategy: strategy.name,
					value,
				});
			}
			None => debug!("Extraction strategy '{}' yielded nothing", strategy.name),
		}
	}
	None
}
