//! RPC endpoint rotation
//!
//! Every chain read and write runs through an ordered list of endpoints:
//! try each in turn, stop at the first success, and if all fail surface the
//! last endpoint's error. This is rotation, not backoff - the point is to
//! route around an unhealthy RPC provider, not to wait one out.

use crate::common::ChainError;
use std::future::Future;
use tracing::{debug, warn};

/// An ordered list of RPC endpoint URLs.
#[derive(Debug, Clone)]
pub struct RpcEndpoints {
	urls: Vec<String>,
}

impl RpcEndpoints {
	pub fn new(urls: Vec<String>) -> Result<Self, ChainError> {
		if urls.is_empty() {
			return Err(ChainError::Configuration(
				"at least one RPC endpoint is required".to_string(),
			));
		}
		Ok(Self { urls })
	}

	pub fn urls(&self) -> &[String] {
		&self.urls
	}

	/// Run `op` against each endpoint in order. Exactly one attempt per
	/// endpoint; the first success wins, and exhaustion reports the last
	/// endpoint's error together with the attempt count.
	pub async fn try_each<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, ChainError>
	where
		F: FnMut(String) -> Fut,
		Fut: Future<Output = Result<T, ChainError>>,
	{
		let mut last_error: Option<ChainError> = None;

		for (i, url) in self.urls.iter().enumerate() {
			debug!("{}: attempting endpoint {}/{}", op_name, i + 1, self.urls.len());
			match op(url.clone()).await {
				Ok(value) => return Ok(value),
				Err(e) => {
					warn!("{}: endpoint {} failed: {}", op_name, url, e);
					last_error = Some(e);
				}
			}
		}

		Err(ChainError::EndpointsExhausted {
			attempts: self.urls.len(),
			last_error: last_error
				.map(|e| e.to_string())
				.unwrap_or_else(|| "no endpoints attempted".to_string()),
		})
	}
}
