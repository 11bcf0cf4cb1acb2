//! Unified error handling for the core
//!
//! Upstream failures (storage gateway, RPC, protocol SDK) are classified into
//! stable internal codes before they reach the API layer. Classification uses
//! structured data where the client library exposes it (JSON-RPC error codes,
//! revert payloads) and falls back to substring matching as a best effort.

use thiserror::Error;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum CoreError {
	#[error("Database error: {0}")]
	Database(#[from] sea_orm::DbErr),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Validation failed: {0}")]
	Validation(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Storage gateway error: {0}")]
	Gateway(#[from] crate::storage::GatewayError),

	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),

	#[error("Pipeline aborted at step {step}: {message}")]
	PipelineAborted { step: usize, message: String },

	#[error("Operation timed out after {0} seconds")]
	Timeout(u64),

	#[error("Other error: {0}")]
	Other(#[from] anyhow::Error),
}

/// Errors from blockchain clients
#[derive(Error, Debug)]
pub enum ChainError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Missing IP metadata - upload metadata before registering")]
	MissingMetadata,

	#[error("RPC error: {0}")]
	Rpc(String),

	#[error("Transaction failed: {0}")]
	Transaction(String),

	#[error("Transaction reverted: {0}")]
	Reverted(String),

	#[error("Transaction rejected by user")]
	Rejected,

	#[error("Insufficient funds for transaction")]
	InsufficientFunds,

	#[error("All {attempts} RPC endpoints failed, last error: {last_error}")]
	EndpointsExhausted { attempts: usize, last_error: String },

	#[error("Royalty vault not yet deployed for {0}")]
	VaultNotDeployed(String),

	#[error("Invalid address: {0}")]
	InvalidAddress(String),

	#[error("Invalid private key: {0}")]
	InvalidPrivateKey(String),
}

/// Stable internal error codes surfaced through the API envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	ValidationError,
	NotFound,
	Conflict,
	MissingMetadata,
	InsufficientFunds,
	ExecutionReverted,
	UserRejected,
	Network,
	UpstreamFailure,
	DatabaseError,
	Timeout,
	Internal,
}

impl ErrorCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorCode::ValidationError => "VALIDATION_ERROR",
			ErrorCode::NotFound => "NOT_FOUND",
			ErrorCode::Conflict => "CONFLICT",
			ErrorCode::MissingMetadata => "MISSING_METADATA",
			ErrorCode::InsufficientFunds => "INSUFFICIENT_FUNDS",
			ErrorCode::ExecutionReverted => "EXECUTION_REVERTED",
			ErrorCode::UserRejected => "USER_REJECTED",
			ErrorCode::Network => "NETWORK",
			ErrorCode::UpstreamFailure => "UPSTREAM_FAILURE",
			ErrorCode::DatabaseError => "DATABASE_ERROR",
			ErrorCode::Timeout => "TIMEOUT",
			ErrorCode::Internal => "INTERNAL",
		}
	}
}

impl CoreError {
	/// Map an error to its stable code for the API envelope
	pub fn code(&self) -> ErrorCode {
		match self {
			CoreError::Validation(_) => ErrorCode::ValidationError,
			CoreError::NotFound(_) => ErrorCode::NotFound,
			CoreError::Conflict(_) => ErrorCode::Conflict,
			CoreError::Database(_) => ErrorCode::DatabaseError,
			CoreError::Timeout(_) => ErrorCode::Timeout,
			CoreError::Gateway(e) => match e {
				crate::storage::GatewayError::Network(_) => ErrorCode::Network,
				_ => ErrorCode::UpstreamFailure,
			},
			CoreError::Chain(e) => e.code(),
			CoreError::PipelineAborted { .. } => ErrorCode::UpstreamFailure,
			_ => ErrorCode::Internal,
		}
	}

	/// Whether the error message is safe to show to end users verbatim
	pub fn user_friendly(&self) -> bool {
		matches!(
			self,
			CoreError::Validation(_)
				| CoreError::NotFound(_)
				| CoreError::Conflict(_)
				| CoreError::Chain(ChainError::Rejected)
				| CoreError::Chain(ChainError::InsufficientFunds)
				| CoreError::Chain(ChainError::MissingMetadata)
				| CoreError::Chain(ChainError::VaultNotDeployed(_))
		)
	}
}

impl ChainError {
	pub fn code(&self) -> ErrorCode {
		match self {
			ChainError::MissingMetadata => ErrorCode::MissingMetadata,
			ChainError::InsufficientFunds => ErrorCode::InsufficientFunds,
			ChainError::Reverted(_) => ErrorCode::ExecutionReverted,
			ChainError::Rejected => ErrorCode::UserRejected,
			ChainError::Rpc(_) | ChainError::EndpointsExhausted { .. } => ErrorCode::Network,
			_ => ErrorCode::UpstreamFailure,
		}
	}

	/// Classify a raw upstream error message into a typed chain error.
	///
	/// Substring matching on third-party error strings is brittle and
	/// version-dependent; it is only applied after structured classification
	/// has been exhausted, and the raw text is preserved for diagnostics.
	pub fn classify(raw: impl Into<String>) -> Self {
		let raw = raw.into();
		let lower = raw.to_lowercase();

		if lower.contains("insufficient funds") {
			ChainError::InsufficientFunds
		} else if lower.contains("execution reverted") || lower.contains("revert") {
			ChainError::Reverted(raw)
		} else if lower.contains("rejected") || lower.contains("denied") {
			ChainError::Rejected
		} else if lower.contains("network")
			|| lower.contains("connection")
			|| lower.contains("timeout")
			|| lower.contains("timed out")
		{
			ChainError::Rpc(raw)
		} else {
			ChainError::Transaction(raw)
		}
	}
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
