//! Configurable retry schedules
//!
//! Polling loops take their delays from an injected policy instead of
//! hard-coded sleeps, so tests can run with near-zero schedules.

use std::time::Duration;

/// A fixed schedule of delays between attempts.
///
/// An empty schedule means a single attempt with no retries. The number of
/// attempts is always `delays.len() + 1`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	delays: Vec<Duration>,
}

impl RetryPolicy {
	pub fn new(delays: Vec<Duration>) -> Self {
		Self { delays }
	}

	/// Schedule used while waiting for the royalty vault to appear in RPC
	/// indexers: progressive 5s, 7s, 10s, 10s, 10s.
	pub fn vault_resolution() -> Self {
		Self::new(
			[5, 7, 10, 10, 10]
				.into_iter()
				.map(Duration::from_secs)
				.collect(),
		)
	}

	/// Single attempt, no retries.
	pub fn none() -> Self {
		Self::new(Vec::new())
	}

	/// Fast schedule for tests.
	pub fn immediate(attempts: usize) -> Self {
		Self::new(vec![Duration::ZERO; attempts.saturating_sub(1)])
	}

	pub fn max_attempts(&self) -> usize {
		self.delays.len() + 1
	}

	/// Delay to wait *before* attempt `n` (attempts are zero-indexed; there
	/// is no delay before the first).
	pub fn delay_before(&self, attempt: usize) -> Option<Duration> {
		if attempt == 0 {
			None
		} else {
			self.delays.get(attempt - 1).copied()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn vault_schedule_matches_documented_delays() {
		let policy = RetryPolicy::vault_resolution();
		assert_eq!(policy.max_attempts(), 6);
		assert_eq!(policy.delay_before(0), None);
		assert_eq!(policy.delay_before(1), Some(Duration::from_secs(5)));
		assert_eq!(policy.delay_before(2), Some(Duration::from_secs(7)));
		assert_eq!(policy.delay_before(3), Some(Duration::from_secs(10)));
		assert_eq!(policy.delay_before(5), Some(Duration::from_secs(10)));
		assert_eq!(policy.delay_before(6), None);
	}

	#[test]
	fn immediate_schedule_has_zero_delays() {
		let policy = RetryPolicy::immediate(3);
		assert_eq!(policy.max_attempts(), 3);
		assert_eq!(policy.delay_before(1), Some(Duration::ZERO));
	}
}
