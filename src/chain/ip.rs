//! Story Protocol IP registration client
//!
//! Two registration strategies are supported:
//! - direct registration of an already-minted registry token (older flow);
//! - gateway ("SPG") registration, which mints a fresh NFT, registers it as
//!   an IP Asset and attaches license terms in a single transaction. The
//!   gateway path is preferred because it sidesteps ownership-transfer
//!   edge cases.
//!
//! After a successful registration exactly one license token is minted
//! against the IP Asset. Attaching license terms alone does not trigger
//! royalty-vault deployment; the license-token mint is the only reliable
//! trigger.

use super::endpoints::RpcEndpoints;
use super::strategy::{first_success, NamedStrategy};
use super::tx;
use crate::common::ChainError;
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Log, TransactionReceipt, TransactionRequest, H256, U256};
use ethers::utils::keccak256;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// IP metadata pointers required by the protocol.
///
/// Both URIs are deterministic (derived from the pinned metadata CID) and
/// both hashes are 0x-prefixed hex derived from the content hash.
#[derive(Debug, Clone)]
pub struct IpMetadata {
	pub ip_metadata_uri: String,
	pub ip_metadata_hash: String,
	pub nft_metadata_uri: String,
	pub nft_metadata_hash: String,
}

impl IpMetadata {
	/// Registration is refused outright when metadata is absent or
	/// malformed; there is no partial registration to recover from.
	pub fn validate(&self) -> Result<(), ChainError> {
		let uris = [&self.ip_metadata_uri, &self.nft_metadata_uri];
		if uris.iter().any(|uri| uri.trim().is_empty()) {
			return Err(ChainError::MissingMetadata);
		}
		for hash in [&self.ip_metadata_hash, &self.nft_metadata_hash] {
			let stripped = match hash.strip_prefix("0x") {
				Some(s) => s,
				None => return Err(ChainError::MissingMetadata),
			};
			if stripped.len() != 64 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
				return Err(ChainError::MissingMetadata);
			}
		}
		Ok(())
	}
}

/// License terms configuration for a registration
#[derive(Debug, Clone)]
pub struct LicenseParams {
	/// Revenue share owed to the IP owner, in percent (0-100)
	pub commercial_rev_share: u32,
	/// Fee per minted license token, in wei
	pub default_minting_fee: u128,
}

/// A completed IP registration
#[derive(Debug, Clone)]
pub struct IpRegistration {
	/// IP Asset address
	pub ip_id: String,
	/// Token id of the NFT backing the IP Asset (gateway flow mints it)
	pub token_id: Option<u64>,
	pub tx_hash: String,
	pub license_terms_id: u64,
}

/// Result of minting a license token. The raw receipt logs travel with it
/// because the royalty vault resolver's fastest strategy decodes them.
#[derive(Debug, Clone)]
pub struct LicenseMint {
	pub tx_hash: String,
	pub logs: Vec<Log>,
}

/// Seam for the IP protocol, mockable in tests.
#[async_trait]
pub trait IpApi: Send + Sync {
	/// Register an already-minted NFT as an IP Asset (direct flow).
	async fn register_direct(
		&self,
		nft_contract: &str,
		token_id: u64,
		metadata: &IpMetadata,
		license: &LicenseParams,
	) -> Result<IpRegistration, ChainError>;

	/// Mint + register + attach license terms in one transaction (SPG flow).
	async fn register_via_gateway(
		&self,
		metadata: &IpMetadata,
		license: &LicenseParams,
	) -> Result<IpRegistration, ChainError>;

	/// Attach license terms to an IP Asset. Idempotent: re-attaching
	/// already-attached terms is not an error.
	async fn attach_license_terms(
		&self,
		ip_id: &str,
		license_terms_id: u64,
	) -> Result<(), ChainError>;

	/// Mint one license token against a registered IP Asset.
	async fn mint_license_token(
		&self,
		ip_id: &str,
		license_terms_id: u64,
		receiver: &str,
	) -> Result<LicenseMint, ChainError>;
}

pub struct IpClient {
	endpoints: RpcEndpoints,
	wallet: LocalWallet,
	spg: Address,
	licensing_module: Address,
	confirmation_budget: Duration,
}

impl IpClient {
	pub fn new(
		endpoints: RpcEndpoints,
		private_key: &str,
		chain_id: u64,
		spg_address: &str,
		licensing_module_address: &str,
		confirmation_budget: Duration,
	) -> Result<Self, ChainError> {
		let wallet = private_key
			.parse::<LocalWallet>()
			.map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?
			.with_chain_id(chain_id);

		Ok(Self {
			endpoints,
			wallet,
			spg: parse_address(spg_address)?,
			licensing_module: parse_address(licensing_module_address)?,
			confirmation_budget,
		})
	}

	async fn send(
		&self,
		url: String,
		to: Address,
		calldata: Bytes,
	) -> Result<TransactionReceipt, ChainError> {
		let provider = Provider::<Http>::try_from(url.as_str())
			.map_err(|e| ChainError::Rpc(e.to_string()))?;
		let client = SignerMiddleware::new(provider, self.wallet.clone());

		let request = TransactionRequest::new().to(to).data(calldata);
		let pending = client
			.send_transaction(request, None)
			.await
			.map_err(|e| ChainError::classify(e.to_string()))?;

		tx::wait_for_receipt(pending, self.confirmation_budget, |_| {}).await
	}

	async fn extract_registration(
		&self,
		receipt: &TransactionReceipt,
		license_terms_id: u64,
	) -> Result<IpRegistration, ChainError> {
		let tx_hash = format!("{:?}", receipt.transaction_hash);

		let ip_id = first_success(vec![
			NamedStrategy::new("ip-registered-event", async {
				ip_id_from_registered_event(receipt)
			}),
			NamedStrategy::new("first-padded-address-log", async {
				ip_id_from_padded_log(receipt)
			}),
		])
		.await
		.ok_or_else(|| {
			ChainError::Transaction(format!(
				"registration {tx_hash} confirmed but no strategy could recover the IP id"
			))
		})?;

		Ok(IpRegistration {
			ip_id: format!("{:?}", ip_id.value),
			token_id: super::registry::token_id_from_transfer(receipt),
			tx_hash,
			license_terms_id,
		})
	}
}

#[async_trait]
impl IpApi for IpClient {
	async fn register_direct(
		&self,
		nft_contract: &str,
		token_id: u64,
		metadata: &IpMetadata,
		license: &LicenseParams,
	) -> Result<IpRegistration, ChainError> {
		metadata.validate()?;
		let contract = parse_address(nft_contract)?;

		let mut data = selector("registerIp(address,uint256,string,bytes32)").to_vec();
		data.extend_from_slice(&encode(&[
			Token::Address(contract),
			Token::Uint(U256::from(token_id)),
			Token::String(metadata.ip_metadata_uri.clone()),
			Token::FixedBytes(hash_word(&metadata.ip_metadata_hash)?.to_vec()),
		]));
		let calldata = Bytes::from(data);

		let receipt = self
			.endpoints
			.try_each("register_direct", |url| {
				self.send(url, self.spg, calldata.clone())
			})
			.await?;

		let registration = self
			.extract_registration(&receipt, license_terms_id_for(license))
			.await?;
		info!("Registered IP {} (direct flow)", registration.ip_id);
		Ok(registration)
	}

	async fn register_via_gateway(
		&self,
		metadata: &IpMetadata,
		license: &LicenseParams,
	) -> Result<IpRegistration, ChainError> {
		metadata.validate()?;

		let mut data =
			selector("mintAndRegisterIpAndAttachPilTerms(address,string,bytes32,string,bytes32,uint32,uint256)")
				.to_vec();
		data.extend_from_slice(&encode(&[
			Token::Address(self.wallet.address()),
			Token::String(metadata.ip_metadata_uri.clone()),
			Token::FixedBytes(hash_word(&metadata.ip_metadata_hash)?.to_vec()),
			Token::String(metadata.nft_metadata_uri.clone()),
			Token::FixedBytes(hash_word(&metadata.nft_metadata_hash)?.to_vec()),
			Token::Uint(U256::from(license.commercial_rev_share)),
			Token::Uint(U256::from(license.default_minting_fee)),
		]));
		let calldata = Bytes::from(data);

		let receipt = self
			.endpoints
			.try_each("register_via_gateway", |url| {
				self.send(url, self.spg, calldata.clone())
			})
			.await?;

		let registration = self
			.extract_registration(&receipt, license_terms_id_for(license))
			.await?;
		info!("Registered IP {} (gateway flow)", registration.ip_id);
		Ok(registration)
	}

	async fn attach_license_terms(
		&self,
		ip_id: &str,
		license_terms_id: u64,
	) -> Result<(), ChainError> {
		let ip = parse_address(ip_id)?;

		let mut data = selector("attachLicenseTerms(address,uint256)").to_vec();
		data.extend_from_slice(&encode(&[
			Token::Address(ip),
			Token::Uint(U256::from(license_terms_id)),
		]));
		let calldata = Bytes::from(data);

		let result = self
			.endpoints
			.try_each("attach_license_terms", |url| {
				self.send(url, self.licensing_module, calldata.clone())
			})
			.await;

		match result {
			Ok(_) => Ok(()),
			Err(ref e) if is_already_attached(e) => {
				debug!("License terms {} already attached to {}", license_terms_id, ip_id);
				Ok(())
			}
			Err(e) => Err(e),
		}
	}

	async fn mint_license_token(
		&self,
		ip_id: &str,
		license_terms_id: u64,
		receiver: &str,
	) -> Result<LicenseMint, ChainError> {
		let ip = parse_address(ip_id)?;
		let to = parse_address(receiver)?;

		let mut data =
			selector("mintLicenseTokens(address,uint256,uint256,address)").to_vec();
		data.extend_from_slice(&encode(&[
			Token::Address(ip),
			Token::Uint(U256::from(license_terms_id)),
			Token::Uint(U256::one()),
			Token::Address(to),
		]));
		let calldata = Bytes::from(data);

		let receipt = self
			.endpoints
			.try_each("mint_license_token", |url| {
				self.send(url, self.licensing_module, calldata.clone())
			})
			.await?;

		info!("Minted license token for {} in {:?}", ip_id, receipt.transaction_hash);
		Ok(LicenseMint {
			tx_hash: format!("{:?}", receipt.transaction_hash),
			logs: receipt.logs,
		})
	}
}

/// Whether a failure means the terms were already attached - the condition
/// is swallowed so re-running registration stays idempotent.
pub fn is_already_attached(err: &ChainError) -> bool {
	let text = match err {
		ChainError::Reverted(msg) | ChainError::Transaction(msg) => msg,
		ChainError::EndpointsExhausted { last_error, .. } => last_error,
		_ => return false,
	};
	let lower = text.to_lowercase();
	lower.contains("already attached") || lower.contains("license terms already")
}

/// Strategy 1: the protocol's `IPRegistered` event, IP address left-padded
/// in the first indexed topic.
fn ip_id_from_registered_event(receipt: &TransactionReceipt) -> Option<Address> {
	let topic0 = H256::from(keccak256(b"IPRegistered(address,uint256,address,uint256,string)"));
	receipt
		.logs
		.iter()
		.find(|log| log.topics.first() == Some(&topic0) && log.topics.len() >= 2)
		.and_then(|log| padded_address(log.topics[1].as_bytes()))
}

/// Strategy 2: first log whose leading 32-byte word is a left-padded,
/// non-zero contract address.
fn ip_id_from_padded_log(receipt: &TransactionReceipt) -> Option<Address> {
	receipt
		.logs
		.iter()
		.filter_map(|log| padded_address(log.data.as_ref().get(..32)?))
		.next()
}

/// Decode a 32-byte word into an address if it is left-padded with zeros
/// and non-zero. The zero address is never a valid result.
pub fn padded_address(word: &[u8]) -> Option<Address> {
	if word.len() != 32 || !word[..12].iter().all(|b| *b == 0) {
		return None;
	}
	let address = Address::from_slice(&word[12..]);
	(!address.is_zero()).then_some(address)
}

fn license_terms_id_for(license: &LicenseParams) -> u64 {
	// PIL terms ids are deterministic per (rev share, minting fee) pair in
	// the deployed template; non-commercial terms are id 1
	if license.commercial_rev_share == 0 && license.default_minting_fee == 0 {
		1
	} else {
		2
	}
}

fn parse_address(s: &str) -> Result<Address, ChainError> {
	Address::from_str(s).map_err(|e| ChainError::InvalidAddress(format!("{s}: {e}")))
}

fn hash_word(hash: &str) -> Result<[u8; 32], ChainError> {
	let stripped = hash.strip_prefix("0x").ok_or(ChainError::MissingMetadata)?;
	let bytes = hex::decode(stripped).map_err(|_| ChainError::MissingMetadata)?;
	bytes.try_into().map_err(|_| ChainError::MissingMetadata)
}

fn selector(signature: &str) -> [u8; 4] {
	let hash = keccak256(signature.as_bytes());
	[hash[0], hash[1], hash[2], hash[3]]
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn valid_metadata() -> IpMetadata {
		IpMetadata {
			ip_metadata_uri: "ipfs://QmMeta".into(),
			ip_metadata_hash: format!("0x{}", "ab".repeat(32)),
			nft_metadata_uri: "ipfs://QmNft".into(),
			nft_metadata_hash: format!("0x{}", "cd".repeat(32)),
		}
	}

	#[test]
	fn metadata_validation_accepts_wellformed() {
		assert!(valid_metadata().validate().is_ok());
	}

	#[test]
	fn metadata_validation_requires_uri() {
		let mut meta = valid_metadata();
		meta.ip_metadata_uri = "  ".into();
		assert!(matches!(meta.validate(), Err(ChainError::MissingMetadata)));
	}

	#[test]
	fn metadata_validation_requires_prefixed_hash() {
		let mut meta = valid_metadata();
		meta.ip_metadata_hash = "ab".repeat(32);
		assert!(matches!(meta.validate(), Err(ChainError::MissingMetadata)));
	}

	#[test]
	fn already_attached_reverts_are_swallowed() {
		assert!(is_already_attached(&ChainError::Reverted(
			"execution reverted: LicensingModule: license terms already attached".into()
		)));
		assert!(is_already_attached(&ChainError::EndpointsExhausted {
			attempts: 2,
			last_error: "reverted: already attached".into(),
		}));
		assert!(!is_already_attached(&ChainError::Reverted(
			"execution reverted: not the owner".into()
		)));
		assert!(!is_already_attached(&ChainError::Rpc("connection reset".into())));
	}

	#[test]
	fn padded_address_rejects_zero_and_garbage() {
		let mut word = [0u8; 32];
		assert_eq!(padded_address(&word), None, "zero address is not deployed");

		word[31] = 0x42;
		let address = padded_address(&word).unwrap();
		assert_eq!(address, Address::from_low_u64_be(0x42));

		// Non-zero padding means the word is not an address at all
		word[0] = 1;
		assert_eq!(padded_address(&word), None);
		assert_eq!(padded_address(&[0u8; 16]), None);
	}

	#[test]
	fn nonzero_license_params_select_commercial_terms() {
		let free = LicenseParams {
			commercial_rev_share: 0,
			default_minting_fee: 0,
		};
		let commercial = LicenseParams {
			commercial_rev_share: 10,
			default_minting_fee: 0,
		};
		assert_eq!(license_terms_id_for(&free), 1);
		assert_eq!(license_terms_id_for(&commercial), 2);
	}
}
