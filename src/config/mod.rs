//! Application configuration
//!
//! A JSON config file in the data directory carries everything that is safe
//! to persist; secrets (gateway token, server wallet key) come from the
//! environment and are validated at startup with descriptive fatal errors.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

const CONFIG_FILE: &str = "dippchain.json";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// HTTP listen port
	pub port: u16,

	/// Database connection string
	pub database_url: String,

	/// Blockchain configuration
	#[serde(default)]
	pub chain: ChainConfig,

	/// Storage gateway configuration
	#[serde(default)]
	pub storage: StorageConfig,

	/// Marketplace settlement configuration
	#[serde(default)]
	pub settlement: SettlementConfig,
}

/// Chain endpoints and contract addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
	/// RPC endpoints, tried in order on any failure
	pub rpc_urls: Vec<String>,
	pub chain_id: u64,
	/// DippChain asset registry contract
	pub registry_address: String,
	/// Story Protocol gateway (SPG) contract for mint-and-register
	pub spg_address: String,
	/// Story Protocol licensing module
	pub licensing_module_address: String,
	/// Story Protocol royalty module, polled during vault resolution
	#[serde(default)]
	pub royalty_module_address: String,
	/// Seconds to wait for a confirmation before signalling "still pending"
	pub confirmation_timeout_secs: u64,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			rpc_urls: vec!["https://aeneid.storyrpc.io".to_string()],
			chain_id: 1315,
			registry_address: String::new(),
			spg_address: String::new(),
			licensing_module_address: String::new(),
			royalty_module_address: String::new(),
			confirmation_timeout_secs: 60,
		}
	}
}

/// Pinning service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
	pub api_url: String,
	pub gateway_url: String,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			api_url: "https://api.pinata.cloud".to_string(),
			gateway_url: "https://gateway.pinata.cloud/ipfs".to_string(),
		}
	}
}

/// Timeout budgets for settlement database transactions and the outbox worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
	/// Maximum time a settlement transaction may hold locks
	pub transaction_timeout_secs: u64,
	/// Outbox worker poll interval
	pub outbox_poll_secs: u64,
	/// Attempts before a transfer task is marked failed
	pub outbox_max_attempts: u32,
}

impl Default for SettlementConfig {
	fn default() -> Self {
		Self {
			transaction_timeout_secs: 15,
			outbox_poll_secs: 30,
			outbox_max_attempts: 5,
		}
	}
}

/// Secrets read from the environment, never persisted
#[derive(Clone)]
pub struct Secrets {
	/// Server wallet private key, normalized to no 0x prefix
	pub wallet_private_key: String,
	/// Pinning service JWT
	pub gateway_token: String,
}

impl std::fmt::Debug for Secrets {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Secrets")
			.field("wallet_private_key", &"<redacted>")
			.field("gateway_token", &"<redacted>")
			.finish()
	}
}

impl Secrets {
	/// Load and validate secrets from the environment.
	pub fn from_env() -> Result<Self> {
		let key = env::var("DIPPCHAIN_PRIVATE_KEY")
			.context("DIPPCHAIN_PRIVATE_KEY is not set (server wallet private key)")?;
		let wallet_private_key = validate_private_key(&key)?;

		let gateway_token = env::var("PINATA_JWT").context("PINATA_JWT is not set")?;
		if gateway_token.trim().is_empty() {
			bail!("PINATA_JWT is set but empty");
		}

		Ok(Self {
			wallet_private_key,
			gateway_token,
		})
	}
}

/// Validate a private key: exactly 64 hex characters, optional 0x prefix.
/// Returns the key without the prefix.
pub fn validate_private_key(key: &str) -> Result<String> {
	let stripped = key.strip_prefix("0x").unwrap_or(key);
	if stripped.len() != 64 {
		bail!(
			"private key must be 64 hex characters (got {}), with an optional 0x prefix",
			stripped.len()
		);
	}
	if !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
		bail!("private key contains non-hex characters");
	}
	Ok(stripped.to_string())
}

/// Validate an RPC URL: http(s) scheme and a non-empty host.
pub fn validate_rpc_url(url: &str) -> Result<()> {
	if !(url.starts_with("http://") || url.starts_with("https://")) {
		bail!("RPC URL '{url}' must start with http:// or https://");
	}
	let rest = url.splitn(2, "://").nth(1).unwrap_or("");
	if rest.is_empty() || rest.starts_with('/') {
		bail!("RPC URL '{url}' has no host");
	}
	Ok(())
}

impl AppConfig {
	/// Load configuration from a specific data directory, creating a default
	/// config file when none exists.
	pub fn load_from(data_dir: &PathBuf) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let mut config: AppConfig = serde_json::from_str(&json)?;

			if config.version < Self::target_version() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.clone());
			config.save()?;
			Ok(config)
		}
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		let database_url = format!("sqlite://{}?mode=rwc", data_dir.join("dippchain.db").display());
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			port: 8080,
			database_url,
			chain: ChainConfig::default(),
			storage: StorageConfig::default(),
			settlement: SettlementConfig::default(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	/// Validate everything the daemon needs before serving traffic.
	pub fn validate(&self) -> Result<()> {
		if self.chain.rpc_urls.is_empty() {
			bail!("at least one RPC URL must be configured");
		}
		for url in &self.chain.rpc_urls {
			validate_rpc_url(url)?;
		}
		if self.database_url.trim().is_empty() {
			bail!("database_url must not be empty");
		}
		Ok(())
	}

	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	fn target_version() -> u32 {
		1
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			1 => Ok(()),
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn private_key_accepts_optional_prefix() {
		let key = "a".repeat(64);
		assert_eq!(validate_private_key(&key).unwrap(), key);
		assert_eq!(validate_private_key(&format!("0x{key}")).unwrap(), key);
	}

	#[test]
	fn private_key_rejects_wrong_length() {
		assert!(validate_private_key("abc123").is_err());
		assert!(validate_private_key(&"a".repeat(66)).is_err());
	}

	#[test]
	fn private_key_rejects_non_hex() {
		let key = format!("{}zz", "a".repeat(62));
		assert!(validate_private_key(&key).is_err());
	}

	#[test]
	fn rpc_url_requires_http_scheme_and_host() {
		assert!(validate_rpc_url("https://rpc.example.org").is_ok());
		assert!(validate_rpc_url("wss://rpc.example.org").is_err());
		assert!(validate_rpc_url("https://").is_err());
	}

	#[test]
	fn config_round_trips_through_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().to_path_buf();
		let config = AppConfig::load_from(&path).unwrap();
		assert_eq!(config.port, 8080);

		// Second load reads the file written by the first
		let reloaded = AppConfig::load_from(&path).unwrap();
		assert_eq!(reloaded.database_url, config.database_url);
	}
}
