//! Fractionalization and marketplace

pub mod fractions;
pub mod outbox;
pub mod settlement;

pub use fractions::{Fractions, VaultInfo, VaultLookup};
pub use outbox::OutboxWorker;
pub use settlement::{PrimaryBuy, SecondaryBuy, Settlement, SettlementOutcome};
