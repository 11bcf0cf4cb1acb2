//! DippChain asset registry client
//!
//! Mints a registry token bound to (content hash, metadata URI, watermark
//! id). The minted token id has to be recovered from the transaction
//! receipt: event shapes differ between deployed contract versions, so
//! extraction walks an ordered strategy list instead of trusting one shape.

use super::endpoints::RpcEndpoints;
use super::strategy::{first_success, NamedStrategy};
use super::tx;
use crate::common::ChainError;
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256};
use ethers::utils::keccak256;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// A completed registry registration
#[derive(Debug, Clone)]
pub struct Registration {
	pub tx_hash: String,
	pub token_id: u64,
	/// Which extraction strategy recovered the token id
	pub token_id_source: &'static str,
}

/// Seam for the registry contract, mockable in tests.
#[async_trait]
pub trait RegistryApi: Send + Sync {
	async fn register_asset(
		&self,
		content_hash: &str,
		metadata_uri: &str,
		watermark_id: &str,
	) -> Result<Registration, ChainError>;

	/// Look up a prior registration by content hash. Used to disambiguate
	/// "the transaction may have landed while the database write failed".
	async fn find_registration(&self, content_hash: &str) -> Result<Option<u64>, ChainError>;
}

pub struct RegistryClient {
	endpoints: RpcEndpoints,
	wallet: LocalWallet,
	contract: Address,
	confirmation_budget: Duration,
}

impl RegistryClient {
	pub fn new(
		endpoints: RpcEndpoints,
		private_key: &str,
		chain_id: u64,
		contract_address: &str,
		confirmation_budget: Duration,
	) -> Result<Self, ChainError> {
		let wallet = private_key
			.parse::<LocalWallet>()
			.map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?
			.with_chain_id(chain_id);
		let contract = Address::from_str(contract_address)
			.map_err(|e| ChainError::InvalidAddress(format!("{contract_address}: {e}")))?;

		Ok(Self {
			endpoints,
			wallet,
			contract,
			confirmation_budget,
		})
	}

	async fn register_once(
		&self,
		url: String,
		content_hash: &str,
		metadata_uri: &str,
		watermark_id: &str,
	) -> Result<Registration, ChainError> {
		let provider = Provider::<Http>::try_from(url.as_str())
			.map_err(|e| ChainError::Rpc(e.to_string()))?;
		let client = SignerMiddleware::new(provider, self.wallet.clone());

		let calldata = register_calldata(content_hash, metadata_uri, watermark_id)?;
		let request = TransactionRequest::new().to(self.contract).data(calldata);

		let pending = client
			.send_transaction(request, None)
			.await
			.map_err(|e| ChainError::classify(e.to_string()))?;

		let receipt = tx::wait_for_receipt(pending, self.confirmation_budget, |_| {}).await?;
		let tx_hash = format!("{:?}", receipt.transaction_hash);

		let extracted = first_success(vec![
			NamedStrategy::new("asset-registered-event", async {
				token_id_from_asset_registered(&receipt)
			}),
			NamedStrategy::new("erc721-transfer-topic", async {
				token_id_from_transfer(&receipt)
			}),
			NamedStrategy::new("total-supply-read", async {
				self.read_total_supply(&client).await
			}),
		])
		.await
		.ok_or_else(|| {
			ChainError::Transaction(format!(
				"registered in {tx_hash} but no strategy could recover the token id"
			))
		})?;

		info!(
			"Registry registration {} yielded token {} via {}",
			tx_hash, extracted.value, extracted.strategy
		);

		Ok(Registration {
			tx_hash,
			token_id: extracted.value,
			token_id_source: extracted.strategy,
		})
	}

	/// Best-effort final token id: one-based registries report the latest
	/// minted id as their total supply.
	async fn read_total_supply(
		&self,
		client: &SignerMiddleware<Provider<Http>, LocalWallet>,
	) -> Option<u64> {
		let call: TypedTransaction = TransactionRequest::new()
			.to(self.contract)
			.data(Bytes::from(selector("totalSupply()").to_vec()))
			.into();

		let raw = client.call(&call, None).await.ok()?;
		decode_u256(&raw).map(|v| v.as_u64())
	}
}

#[async_trait]
impl RegistryApi for RegistryClient {
	async fn register_asset(
		&self,
		content_hash: &str,
		metadata_uri: &str,
		watermark_id: &str,
	) -> Result<Registration, ChainError> {
		self.endpoints
			.try_each("register_asset", |url| {
				self.register_once(url, content_hash, metadata_uri, watermark_id)
			})
			.await
	}

	async fn find_registration(&self, content_hash: &str) -> Result<Option<u64>, ChainError> {
		let hash_word = parse_bytes32(content_hash)?;
		self.endpoints
			.try_each("find_registration", |url| async move {
				let provider = Provider::<Http>::try_from(url.as_str())
					.map_err(|e| ChainError::Rpc(e.to_string()))?;

				let mut data = selector("tokenByContentHash(bytes32)").to_vec();
				data.extend_from_slice(&encode(&[Token::FixedBytes(hash_word.to_vec())]));

				let call: TypedTransaction = TransactionRequest::new()
					.to(self.contract)
					.data(Bytes::from(data))
					.into();

				let raw = provider
					.call(&call, None)
					.await
					.map_err(|e| ChainError::classify(e.to_string()))?;

				match decode_u256(&raw) {
					Some(id) if !id.is_zero() => Ok(Some(id.as_u64())),
					_ => Ok(None),
				}
			})
			.await
	}
}

/// ABI calldata for `registerAsset(bytes32,string,string)`.
pub fn register_calldata(
	content_hash: &str,
	metadata_uri: &str,
	watermark_id: &str,
) -> Result<Bytes, ChainError> {
	let hash_word = parse_bytes32(content_hash)?;
	let mut data = selector("registerAsset(bytes32,string,string)").to_vec();
	data.extend_from_slice(&encode(&[
		Token::FixedBytes(hash_word.to_vec()),
		Token::String(metadata_uri.to_string()),
		Token::String(watermark_id.to_string()),
	]));
	Ok(Bytes::from(data))
}

/// Strategy 1: the registry's own `AssetRegistered` event, token id in the
/// first indexed parameter.
pub fn token_id_from_asset_registered(receipt: &TransactionReceipt) -> Option<u64> {
	let topic0 = H256::from(keccak256(b"AssetRegistered(uint256,bytes32,string)"));
	receipt
		.logs
		.iter()
		.find(|log| log.topics.first() == Some(&topic0) && log.topics.len() >= 2)
		.map(|log| U256::from_big_endian(log.topics[1].as_bytes()).as_u64())
}

/// Strategy 2: the standard ERC-721 `Transfer` event's third indexed topic.
pub fn token_id_from_transfer(receipt: &TransactionReceipt) -> Option<u64> {
	let topic0 = H256::from(keccak256(b"Transfer(address,address,uint256)"));
	receipt
		.logs
		.iter()
		.find(|log| log.topics.first() == Some(&topic0) && log.topics.len() == 4)
		.map(|log| U256::from_big_endian(log.topics[3].as_bytes()).as_u64())
}

fn parse_bytes32(hex_str: &str) -> Result<[u8; 32], ChainError> {
	let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
	let bytes = hex::decode(stripped)
		.map_err(|e| ChainError::Configuration(format!("invalid content hash hex: {e}")))?;
	bytes
		.try_into()
		.map_err(|_| ChainError::Configuration("content hash must be 32 bytes".to_string()))
}

fn selector(signature: &str) -> [u8; 4] {
	let hash = keccak256(signature.as_bytes());
	[hash[0], hash[1], hash[2], hash[3]]
}

fn decode_u256(raw: &[u8]) -> Option<U256> {
	if raw.len() < 32 {
		return None;
	}
	Some(U256::from_big_endian(&raw[..32]))
}

#[cfg(test)]
mod tests {
	use super::*;
	use ethers::types::Log;
	use pretty_assertions::assert_eq;

	fn topic_u256(value: u64) -> H256 {
		let mut word = [0u8; 32];
		U256::from(value).to_big_endian(&mut word);
		H256::from(word)
	}

	fn receipt_with_logs(logs: Vec<Log>) -> TransactionReceipt {
		TransactionReceipt {
			logs,
			..Default::default()
		}
	}

	#[test]
	fn asset_registered_event_wins_over_transfer() {
		let asset_registered = Log {
			topics: vec![
				H256::from(keccak256(b"AssetRegistered(uint256,bytes32,string)")),
				topic_u256(42),
			],
			..Default::default()
		};
		let transfer = Log {
			topics: vec![
				H256::from(keccak256(b"Transfer(address,address,uint256)")),
				H256::zero(),
				H256::zero(),
				topic_u256(7),
			],
			..Default::default()
		};
		let receipt = receipt_with_logs(vec![transfer, asset_registered]);

		assert_eq!(token_id_from_asset_registered(&receipt), Some(42));
		assert_eq!(token_id_from_transfer(&receipt), Some(7));
	}

	#[test]
	fn transfer_fallback_requires_three_indexed_topics() {
		// ERC-20 Transfer carries the amount in data, not in a topic; it
		// must not be mistaken for an NFT mint
		let erc20_transfer = Log {
			topics: vec![
				H256::from(keccak256(b"Transfer(address,address,uint256)")),
				H256::zero(),
				H256::zero(),
			],
			..Default::default()
		};
		let receipt = receipt_with_logs(vec![erc20_transfer]);
		assert_eq!(token_id_from_transfer(&receipt), None);
	}

	#[test]
	fn unrelated_logs_yield_nothing() {
		let receipt = receipt_with_logs(vec![Log::default()]);
		assert_eq!(token_id_from_asset_registered(&receipt), None);
		assert_eq!(token_id_from_transfer(&receipt), None);
	}

	#[test]
	fn register_calldata_is_selector_plus_abi() {
		let hash = "a".repeat(64);
		let data = register_calldata(&hash, "ipfs://meta", "DIPP-1").unwrap();
		assert_eq!(&data[..4], &selector("registerAsset(bytes32,string,string)"));
		// bytes32 argument is inlined right after the selector
		assert_eq!(&data[4..36], &[0xaa; 32]);
	}

	#[test]
	fn register_calldata_rejects_malformed_hash() {
		assert!(register_calldata("zz", "ipfs://meta", "DIPP-1").is_err());
	}
}
