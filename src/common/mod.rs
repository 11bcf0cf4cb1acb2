//! Shared primitives used across the core

pub mod errors;
pub mod retry;

pub use errors::{ChainError, CoreError, ErrorCode, Result};
pub use retry::RetryPolicy;
