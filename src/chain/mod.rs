//! Blockchain clients
//!
//! Everything that talks to RPC endpoints: the DippChain registry, the IP
//! protocol gateway, royalty vault resolution and token transfers. The
//! shared resilience shapes live here too - endpoint rotation and the
//! first-success-wins extraction strategy list.

pub mod endpoints;
pub mod ip;
pub mod registry;
pub mod strategy;
pub mod tokens;
pub mod tx;
pub mod vault;

pub use endpoints::RpcEndpoints;
pub use ip::{IpApi, IpClient, IpMetadata, IpRegistration, LicenseMint, LicenseParams};
pub use registry::{Registration, RegistryApi, RegistryClient};
pub use tokens::{TokenTransfer, TokenTransferClient};
pub use vault::{RoyaltyVaultResolver, VaultResolution, VaultState};
