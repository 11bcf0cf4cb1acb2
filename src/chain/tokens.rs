//! Royalty token transfers
//!
//! Vault tokens are ERC-20-like; settlement moves them from the creator's
//! IP account to the buyer after the database commit, driven by the outbox
//! worker.

use super::endpoints::RpcEndpoints;
use super::tx;
use crate::common::ChainError;
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use ethers::utils::keccak256;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Seam for moving royalty tokens, mockable in tests.
#[async_trait]
pub trait TokenTransfer: Send + Sync {
	/// Transfer `amount` vault tokens to `to`, returning the transfer
	/// transaction hash.
	async fn transfer(
		&self,
		token_address: &str,
		to: &str,
		amount: u64,
	) -> Result<String, ChainError>;
}

pub struct TokenTransferClient {
	endpoints: RpcEndpoints,
	wallet: LocalWallet,
	confirmation_budget: Duration,
}

impl TokenTransferClient {
	pub fn new(
		endpoints: RpcEndpoints,
		private_key: &str,
		chain_id: u64,
		confirmation_budget: Duration,
	) -> Result<Self, ChainError> {
		let wallet = private_key
			.parse::<LocalWallet>()
			.map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?
			.with_chain_id(chain_id);
		Ok(Self {
			endpoints,
			wallet,
			confirmation_budget,
		})
	}
}

#[async_trait]
impl TokenTransfer for TokenTransferClient {
	async fn transfer(
		&self,
		token_address: &str,
		to: &str,
		amount: u64,
	) -> Result<String, ChainError> {
		let token = Address::from_str(token_address)
			.map_err(|e| ChainError::InvalidAddress(format!("{token_address}: {e}")))?;
		let recipient = Address::from_str(to)
			.map_err(|e| ChainError::InvalidAddress(format!("{to}: {e}")))?;

		let mut data = {
			let hash = keccak256(b"transfer(address,uint256)");
			vec![hash[0], hash[1], hash[2], hash[3]]
		};
		data.extend_from_slice(&encode(&[
			Token::Address(recipient),
			Token::Uint(U256::from(amount)),
		]));
		let calldata = Bytes::from(data);

		self.endpoints
			.try_each("token_transfer", |url| {
				let calldata = calldata.clone();
				async move {
					let provider = Provider::<Http>::try_from(url.as_str())
						.map_err(|e| ChainError::Rpc(e.to_string()))?;
					let client = SignerMiddleware::new(provider, self.wallet.clone());

					let request = TransactionRequest::new().to(token).data(calldata);
					let pending = client
						.send_transaction(request, None)
						.await
						.map_err(|e| ChainError::classify(e.to_string()))?;

					let receipt =
						tx::wait_for_receipt(pending, self.confirmation_budget, |_| {}).await?;
					let tx_hash = format!("{:?}", receipt.transaction_hash);
					info!("Transferred {} tokens to {} in {}", amount, to, tx_hash);
					Ok(tx_hash)
				}
			})
			.await
	}
}
