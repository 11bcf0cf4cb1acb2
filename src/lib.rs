//! DippChain core
//!
//! Backend for registering creative works: content fingerprinting and
//! watermarking, IPFS pinning, on-chain and IP-protocol registration,
//! royalty-token fractionalization with marketplace settlement, sentinel
//! infringement detection and token-weighted governance.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
	filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub mod api;
pub mod chain;
pub mod common;
pub mod config;
pub mod content;
pub mod governance;
pub mod infra;
pub mod market;
pub mod pipeline;
pub mod sentinel;
pub mod storage;

use api::AppState;
use chain::endpoints::RpcEndpoints;
use chain::ip::IpClient;
use chain::registry::RegistryClient;
use chain::tokens::TokenTransferClient;
use chain::vault::RoyaltyVaultResolver;
use common::{Result, RetryPolicy};
use config::{AppConfig, Secrets};
use governance::Governance;
use market::{Fractions, OutboxWorker, Settlement};
use pipeline::UploadOrchestrator;
use sentinel::Sentinel;
use storage::PinataClient;

/// Console output stays at INFO in release; the log file always gets DEBUG.
#[cfg(debug_assertions)]
const CONSOLE_LOG_FILTER: LevelFilter = LevelFilter::DEBUG;

#[cfg(not(debug_assertions))]
const CONSOLE_LOG_FILTER: LevelFilter = LevelFilter::INFO;

/// Initialize tracing with a console layer and a daily-rolling file layer.
/// The returned guard must be held for the life of the process.
pub fn init_logging(logs_dir: &Path, log_level: &str) -> Result<WorkerGuard> {
	let (non_blocking, guard) = tracing_appender::non_blocking(rolling::daily(logs_dir, "log"));

	let directive = format!("dippchain_core={log_level}")
		.parse()
		.map_err(|e| common::CoreError::Validation(format!("invalid log level: {e}")))?;

	tracing_subscriber::registry()
		.with(
			EnvFilter::from_default_env()
				.add_directive(LevelFilter::WARN.into())
				.add_directive(directive),
		)
		.with(fmt::layer().with_filter(CONSOLE_LOG_FILTER))
		.with(
			fmt::layer()
				.with_writer(non_blocking)
				.with_ansi(false)
				.with_filter(LevelFilter::DEBUG),
		)
		.init();
	Ok(guard)
}

/// Everything the server needs, wired together: shared HTTP state plus the
/// outbox worker to spawn alongside it.
pub struct Core {
	pub state: Arc<AppState>,
	pub outbox: OutboxWorker,
}

impl Core {
	pub async fn new(config: &AppConfig, secrets: &Secrets) -> Result<Self> {
		let db = infra::db::connect(&config.database_url).await?;

		let endpoints = RpcEndpoints::new(config.chain.rpc_urls.clone())?;
		let confirmation_budget = Duration::from_secs(config.chain.confirmation_timeout_secs);

		let storage = Arc::new(PinataClient::new(
			&config.storage,
			secrets.gateway_token.clone(),
		));
		let registry = Arc::new(RegistryClient::new(
			endpoints.clone(),
			&secrets.wallet_private_key,
			config.chain.chain_id,
			&config.chain.registry_address,
			confirmation_budget,
		)?);
		let ip = Arc::new(IpClient::new(
			endpoints.clone(),
			&secrets.wallet_private_key,
			config.chain.chain_id,
			&config.chain.spg_address,
			&config.chain.licensing_module_address,
			confirmation_budget,
		)?);
		let vault = Arc::new(RoyaltyVaultResolver::new(
			endpoints.clone(),
			&config.chain.royalty_module_address,
			RetryPolicy::vault_resolution(),
		)?);
		let transfers = Arc::new(TokenTransferClient::new(
			endpoints,
			&secrets.wallet_private_key,
			config.chain.chain_id,
			confirmation_budget,
		)?);

		let orchestrator =
			UploadOrchestrator::new(db.clone(), storage, registry, ip.clone());
		let settlement = Settlement::new(
			db.clone(),
			Duration::from_secs(config.settlement.transaction_timeout_secs),
		);
		let outbox = OutboxWorker::new(
			db.clone(),
			transfers,
			Duration::from_secs(config.settlement.outbox_poll_secs),
			config.settlement.outbox_max_attempts as i32,
		);

		let state = Arc::new(AppState {
			orchestrator,
			settlement,
			fractions: Fractions::new(db.clone()),
			sentinel: Sentinel::new(db.clone()),
			governance: Governance::new(db.clone()),
			ip,
			vault,
			registry_address: config.chain.registry_address.clone(),
			db,
		});

		info!(port = config.port, "core initialized");
		Ok(Self { state, outbox })
	}
}
