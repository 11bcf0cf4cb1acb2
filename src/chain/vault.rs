//! Royalty vault resolution
//!
//! The protocol deploys an ERC-20-like royalty vault for an IP Asset as a
//! side effect of the first license-token mint, and never returns its
//! address synchronously. Resolution walks three strategies: decode the
//! mint receipt's logs, poll the protocol read method under a progressive
//! schedule (RPC indexers lag), and finally a direct contract call.
//!
//! Callers must be able to tell "not yet deployed - mint a license token
//! or wait" apart from a resolution error, so the outcome is a dedicated
//! enum rather than an optional address.

use super::endpoints::RpcEndpoints;
use super::ip::padded_address;
use super::strategy::{first_success, NamedStrategy};
use crate::common::{ChainError, RetryPolicy};
use ethers::abi::{encode, Token};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Log, TransactionRequest};
use ethers::utils::keccak256;
use std::str::FromStr;
use tracing::{debug, info};

/// Outcome of a vault resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultResolution {
	/// The vault contract exists at this address
	Deployed(String),
	/// Resolution worked but the protocol has not deployed the vault yet;
	/// minting a license token (or waiting out indexing lag) is the remedy
	NotYetDeployed,
}

/// Vault lifecycle as driven by license operations. Transitions are
/// one-directional and idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VaultState {
	None,
	TermsAttached,
	LicenseMinted,
	Deployed,
}

impl VaultState {
	/// Advance toward `target`; moving backwards is a no-op.
	pub fn advance(self, target: VaultState) -> VaultState {
		self.max(target)
	}
}

pub struct RoyaltyVaultResolver {
	endpoints: RpcEndpoints,
	royalty_module: Address,
	policy: RetryPolicy,
}

impl RoyaltyVaultResolver {
	pub fn new(
		endpoints: RpcEndpoints,
		royalty_module_address: &str,
		policy: RetryPolicy,
	) -> Result<Self, ChainError> {
		let royalty_module = Address::from_str(royalty_module_address)
			.map_err(|e| ChainError::InvalidAddress(format!("{royalty_module_address}: {e}")))?;
		Ok(Self {
			endpoints,
			royalty_module,
			policy,
		})
	}

	/// Resolve the vault for `ip_id`. `mint_logs` are the license-token
	/// mint receipt's logs when the caller has them - the cheapest strategy
	/// reads the address straight out of them with no further RPC calls.
	pub async fn resolve(
		&self,
		ip_id: &str,
		mint_logs: Option<&[Log]>,
	) -> Result<VaultResolution, ChainError> {
		let ip = Address::from_str(ip_id)
			.map_err(|e| ChainError::InvalidAddress(format!("{ip_id}: {e}")))?;

		let extracted = first_success(vec![
			NamedStrategy::new("mint-receipt-log", async {
				mint_logs.and_then(vault_from_mint_logs)
			}),
			NamedStrategy::new("royalty-module-poll", self.poll_royalty_module(ip)),
			NamedStrategy::new("direct-vault-call", self.direct_vault_call(ip)),
		])
		.await;

		match extracted {
			Some(found) => {
				info!(
					"Resolved royalty vault {:?} for {} via {}",
					found.value, ip_id, found.strategy
				);
				Ok(VaultResolution::Deployed(format!("{:?}", found.value)))
			}
			None => Ok(VaultResolution::NotYetDeployed),
		}
	}

	/// Strategy 2: poll `ipRoyaltyVaults(address)` on the royalty module
	/// under the injected schedule, tolerating indexing lag.
	async fn poll_royalty_module(&self, ip: Address) -> Option<Address> {
		let mut data = selector("ipRoyaltyVaults(address)").to_vec();
		data.extend_from_slice(&encode(&[Token::Address(ip)]));
		let calldata = Bytes::from(data);

		for attempt in 0..self.policy.max_attempts() {
			if let Some(delay) = self.policy.delay_before(attempt) {
				tokio::time::sleep(delay).await;
			}

			match self.read(self.royalty_module, calldata.clone()).await {
				Ok(raw) => {
					if let Some(address) = raw.get(..32).and_then(padded_address) {
						return Some(address);
					}
					debug!(
						"Royalty module reports no vault yet for {:?} (attempt {})",
						ip,
						attempt + 1
					);
				}
				Err(e) => debug!("Royalty module poll failed: {}", e),
			}
		}
		None
	}

	/// Strategy 3: ask the IP account contract directly as a last resort.
	async fn direct_vault_call(&self, ip: Address) -> Option<Address> {
		let calldata = Bytes::from(selector("royaltyVault()").to_vec());
		let raw = self.read(ip, calldata).await.ok()?;
		raw.get(..32).and_then(padded_address)
	}

	async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
		self.endpoints
			.try_each("vault_read", |url| {
				let calldata = calldata.clone();
				async move {
					let provider = Provider::<Http>::try_from(url.as_str())
						.map_err(|e| ChainError::Rpc(e.to_string()))?;
					let call: TypedTransaction =
						TransactionRequest::new().to(to).data(calldata).into();
					provider
						.call(&call, None)
						.await
						.map_err(|e| ChainError::classify(e.to_string()))
				}
			})
			.await
	}
}

/// Strategy 1: scan the license-mint receipt for an event whose first
/// 32-byte data word is a left-padded contract address. The zero address
/// means "not deployed", never a valid vault.
pub fn vault_from_mint_logs(logs: &[Log]) -> Option<Address> {
	logs.iter()
		.filter_map(|log| padded_address(log.data.as_ref().get(..32)?))
		.next()
}

fn selector(signature: &str) -> [u8; 4] {
	let hash = keccak256(signature.as_bytes());
	[hash[0], hash[1], hash[2], hash[3]]
}
