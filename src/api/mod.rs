//! HTTP API
//!
//! JSON request/response with a uniform `{success, ...}` envelope. Every
//! collaborator is injected through [`AppState`]; handlers own no clients of
//! their own.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sea_orm::DatabaseConnection;

use crate::chain::ip::IpApi;
use crate::governance::Governance;
use crate::market::{Fractions, Settlement, VaultLookup};
use crate::pipeline::UploadOrchestrator;
use crate::sentinel::Sentinel;

mod assets;
mod error;
mod fractions;
mod governance;
mod marketplace;
mod sentinel;
mod story;

pub use error::{ApiError, ApiResult};

pub struct AppState {
	pub db: DatabaseConnection,
	pub orchestrator: UploadOrchestrator,
	pub settlement: Settlement,
	pub fractions: Fractions,
	pub sentinel: Sentinel,
	pub governance: Governance,
	pub ip: Arc<dyn IpApi>,
	pub vault: Arc<dyn VaultLookup>,
	/// Registry contract address, used as the NFT contract in the direct IP
	/// registration flow.
	pub registry_address: String,
}

pub fn router(state: Arc<AppState>) -> Router {
	Router::new()
		.route("/health", get(|| async { "OK" }))
		.route("/api/assets/upload", post(assets::upload))
		.route("/api/assets/create", post(assets::create))
		.route("/api/assets/register-ip", post(assets::register_ip))
		.route(
			"/api/assets/register-ip-modern",
			post(assets::register_ip_modern),
		)
		.route("/api/assets/diagnose", post(assets::diagnose_asset))
		.route("/api/assets/archive", post(assets::archive))
		.route("/api/assets/verify-onchain", post(assets::verify_onchain))
		.route("/api/fractions/vault", get(fractions::vault))
		.route("/api/fractions/activate", post(fractions::activate))
		.route("/api/story/initialize-vault", post(story::initialize_vault))
		.route("/api/marketplace/buy-primary", post(marketplace::buy_primary))
		.route(
			"/api/marketplace/buy-secondary",
			post(marketplace::buy_secondary),
		)
		.route("/api/sentinel/scan", post(sentinel::scan))
		.route("/api/sentinel/check", post(sentinel::check))
		.route("/api/governance/proposals", post(governance::create_proposal))
		.route("/api/governance/vote", post(governance::vote))
		.route("/api/governance/finalize", post(governance::finalize))
		.with_state(state)
}
