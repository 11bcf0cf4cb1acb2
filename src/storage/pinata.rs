//! Pinata pinning client

use super::{GatewayError, Pinned, StorageGateway};
use crate::config::StorageConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Client for the Pinata pinning API.
pub struct PinataClient {
	http: reqwest::Client,
	api_url: String,
	gateway_url: String,
	token: String,
}

#[derive(Deserialize)]
struct PinResponse {
	#[serde(rename = "IpfsHash")]
	ipfs_hash: String,
}

impl PinataClient {
	pub fn new(config: &StorageConfig, token: String) -> Self {
		Self {
			http: reqwest::Client::new(),
			api_url: config.api_url.trim_end_matches('/').to_string(),
			gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
			token,
		}
	}

	fn retrieval_url(&self, cid: &str) -> String {
		format!("{}/{}", self.gateway_url, cid)
	}

	async fn handle_response(&self, response: reqwest::Response) -> Result<Pinned, GatewayError> {
		let status = response.status();
		if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
			return Err(GatewayError::Unauthorized);
		}
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(GatewayError::Rejected(format!("{status}: {body}")));
		}

		let parsed: PinResponse = response
			.json()
			.await
			.map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

		debug!("Pinned content as {}", parsed.ipfs_hash);
		Ok(Pinned {
			url: self.retrieval_url(&parsed.ipfs_hash),
			cid: parsed.ipfs_hash,
		})
	}
}

#[async_trait]
impl StorageGateway for PinataClient {
	async fn upload_file(
		&self,
		bytes: Vec<u8>,
		name: &str,
		content_type: &str,
	) -> Result<Pinned, GatewayError> {
		let part = reqwest::multipart::Part::bytes(bytes)
			.file_name(name.to_string())
			.mime_str(content_type)
			.map_err(|e| GatewayError::Rejected(format!("invalid content type: {e}")))?;
		let form = reqwest::multipart::Form::new().part("file", part);

		let response = self
			.http
			.post(format!("{}/pinning/pinFileToIPFS", self.api_url))
			.bearer_auth(&self.token)
			.multipart(form)
			.send()
			.await
			.map_err(|e| GatewayError::Network(e.to_string()))?;

		self.handle_response(response).await
	}

	async fn upload_json(
		&self,
		value: &serde_json::Value,
		name: &str,
	) -> Result<Pinned, GatewayError> {
		let body = serde_json::json!({
			"pinataContent": value,
			"pinataMetadata": { "name": name },
		});

		let response = self
			.http
			.post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
			.bearer_auth(&self.token)
			.json(&body)
			.send()
			.await
			.map_err(|e| GatewayError::Network(e.to_string()))?;

		self.handle_response(response).await
	}
}
