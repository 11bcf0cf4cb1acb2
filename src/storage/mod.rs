//! Content-addressed storage gateway
//!
//! Uploads land on a pinning service and come back as a content identifier
//! plus retrieval URL. Failures are a tagged, recoverable error type so the
//! pipeline can distinguish a flaky upstream from a programming error.

mod pinata;

pub use pinata::PinataClient;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A successfully pinned payload
#[derive(Debug, Clone, Serialize)]
pub struct Pinned {
	pub cid: String,
	pub url: String,
}

#[derive(Error, Debug)]
pub enum GatewayError {
	#[error("Gateway rejected upload: {0}")]
	Rejected(String),

	#[error("Gateway network failure: {0}")]
	Network(String),

	#[error("Gateway returned an unexpected response: {0}")]
	MalformedResponse(String),

	#[error("Gateway authentication failed")]
	Unauthorized,
}

/// Seam for the pinning service, mockable in tests.
///
/// Constructed explicitly and injected; there is deliberately no process-wide
/// cached instance.
#[async_trait]
pub trait StorageGateway: Send + Sync {
	/// Pin raw bytes, returning the content identifier and retrieval URL.
	async fn upload_file(
		&self,
		bytes: Vec<u8>,
		name: &str,
		content_type: &str,
	) -> Result<Pinned, GatewayError>;

	/// Pin a JSON document.
	async fn upload_json(
		&self,
		value: &serde_json::Value,
		name: &str,
	) -> Result<Pinned, GatewayError>;
}
