//! Database entities

pub mod asset;
pub mod fraction_holder;
pub mod fractionalization;
pub mod governance_proposal;
pub mod governance_vote;
pub mod marketplace_listing;
pub mod order;
pub mod revenue;
pub mod sentinel_alert;
pub mod sentinel_scan;
pub mod transfer_task;
pub mod user;

pub use asset::AssetStatus;
pub use fractionalization::{FractionalizationStatus, ROYALTY_TOKEN_SUPPLY};
pub use governance_proposal::ProposalStatus;
pub use governance_vote::VoteChoice;
pub use marketplace_listing::ListingStatus;
pub use order::{OrderKind, OrderStatus};
pub use revenue::RevenueSource;
pub use sentinel_alert::Severity;
pub use sentinel_scan::ScanStatus;
pub use transfer_task::TransferTaskStatus;
