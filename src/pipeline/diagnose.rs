//! Recovery diagnosis
//!
//! A pure function over a persisted asset row. Each upload step leaves
//! evidence fields behind; the diagnosis walks the step list in order and
//! reports the first step whose evidence is missing, together with the
//! remediation available for it. No side effects, no database access.

use serde::Serialize;

use crate::infra::db::entities::asset;

/// Remediation for a stalled upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryAction {
	/// Pre-storage evidence is gone; the original bytes were never pinned
	/// and cannot be reconstructed.
	ReUpload,
	/// The registry transaction may have landed on-chain even though the
	/// database write did not; query the chain before concluding failure.
	VerifyOnchain,
	RegisterStoryProtocol,
	/// Every step left its evidence but the status field never advanced.
	UpdateStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosedStep {
	pub step: u8,
	pub name: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
	pub completed_steps: Vec<DiagnosedStep>,
	pub failed_step: Option<DiagnosedStep>,
	pub can_recover: bool,
	pub recovery_action: Option<RecoveryAction>,
	pub reason: String,
}

const STEP_STORAGE: DiagnosedStep = DiagnosedStep {
	step: 1,
	name: "storage upload",
};
const STEP_FINGERPRINT: DiagnosedStep = DiagnosedStep {
	step: 2,
	name: "content fingerprint",
};
const STEP_REGISTRY: DiagnosedStep = DiagnosedStep {
	step: 3,
	name: "on-chain registration",
};
const STEP_IP: DiagnosedStep = DiagnosedStep {
	step: 4,
	name: "ip protocol registration",
};
const STEP_STATUS: DiagnosedStep = DiagnosedStep {
	step: 5,
	name: "status update",
};

/// Diagnose a partially-completed asset.
///
/// Walks the evidence checks in step order and short-circuits at the first
/// missing one; later steps are never inspected, so the reported
/// `failed_step` is always the lowest-numbered incomplete step.
pub fn diagnose(asset: &asset::Model) -> Diagnosis {
	let mut completed = Vec::new();

	if asset.pinata_cid.is_none() || asset.pinata_url.is_none() {
		return Diagnosis {
			completed_steps: completed,
			failed_step: Some(STEP_STORAGE),
			can_recover: false,
			recovery_action: Some(RecoveryAction::ReUpload),
			reason: "no storage pointer was persisted; the original file must be uploaded again"
				.into(),
		};
	}
	completed.push(STEP_STORAGE);

	if asset.content_hash.is_none() || asset.watermark_id.is_none() {
		return Diagnosis {
			completed_steps: completed,
			failed_step: Some(STEP_FINGERPRINT),
			can_recover: false,
			recovery_action: Some(RecoveryAction::ReUpload),
			reason: "content hash or watermark id is missing; the fingerprint cannot be rebuilt \
			         from the pinned copy"
				.into(),
		};
	}
	completed.push(STEP_FINGERPRINT);

	if asset.dippchain_token_id.is_none() || asset.dippchain_tx_hash.is_none() {
		return Diagnosis {
			completed_steps: completed,
			failed_step: Some(STEP_REGISTRY),
			can_recover: true,
			recovery_action: Some(RecoveryAction::VerifyOnchain),
			reason: "no registry token recorded; the transaction may still have confirmed \
			         on-chain"
				.into(),
		};
	}
	completed.push(STEP_REGISTRY);

	if asset.story_protocol_id.is_none() || asset.story_protocol_tx_hash.is_none() {
		return Diagnosis {
			completed_steps: completed,
			failed_step: Some(STEP_IP),
			can_recover: true,
			recovery_action: Some(RecoveryAction::RegisterStoryProtocol),
			reason: "asset is registered on-chain but was never registered with the IP protocol"
				.into(),
		};
	}
	completed.push(STEP_IP);

	if asset.status() < asset::AssetStatus::Registered {
		return Diagnosis {
			completed_steps: completed,
			failed_step: Some(STEP_STATUS),
			can_recover: true,
			recovery_action: Some(RecoveryAction::UpdateStatus),
			reason: "all registration evidence is present but the status field never advanced"
				.into(),
		};
	}
	completed.push(STEP_STATUS);

	Diagnosis {
		completed_steps: completed,
		failed_step: None,
		can_recover: true,
		recovery_action: None,
		reason: "all pipeline steps completed".into(),
	}
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use pretty_assertions::assert_eq;
	use sea_orm::prelude::Uuid;

	use super::*;
	use crate::infra::db::entities::asset::AssetStatus;

	fn bare_asset() -> asset::Model {
		asset::Model {
			id: 1,
			uuid: Uuid::new_v4(),
			owner_id: 1,
			title: "t".into(),
			description: None,
			mime_type: "image/png".into(),
			file_size: 10,
			content_hash: None,
			watermark_id: None,
			pinata_cid: None,
			pinata_url: None,
			thumbnail_cid: None,
			thumbnail_url: None,
			metadata_hash: None,
			metadata_cid: None,
			metadata_url: None,
			dippchain_token_id: None,
			dippchain_tx_hash: None,
			registered_on_chain: false,
			story_protocol_id: None,
			story_protocol_tx_hash: None,
			story_nft_token_id: None,
			story_nft_contract: None,
			license_terms_id: None,
			royalty_vault_address: None,
			status: AssetStatus::Draft.into(),
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn missing_storage_pointer_is_unrecoverable() {
		let d = diagnose(&bare_asset());
		assert_eq!(d.failed_step.map(|s| s.step), Some(1));
		assert!(!d.can_recover);
		assert_eq!(d.recovery_action, Some(RecoveryAction::ReUpload));
		assert!(d.completed_steps.is_empty());
	}

	#[test]
	fn stuck_draft_with_storage_and_fingerprint_points_at_registry() {
		let mut asset = bare_asset();
		asset.pinata_cid = Some("Qm123".into());
		asset.pinata_url = Some("https://gateway/ipfs/Qm123".into());
		asset.content_hash = Some("ab".repeat(32));
		asset.watermark_id = Some("DIPP-x-0001".into());

		let d = diagnose(&asset);
		assert_eq!(d.failed_step.map(|s| s.step), Some(3));
		assert!(d.can_recover);
		assert_eq!(d.recovery_action, Some(RecoveryAction::VerifyOnchain));
		assert_eq!(d.completed_steps.len(), 2);
	}

	#[test]
	fn first_missing_step_wins_even_with_later_evidence_present() {
		let mut asset = bare_asset();
		asset.pinata_cid = Some("Qm123".into());
		asset.pinata_url = Some("https://gateway/ipfs/Qm123".into());
		// No fingerprint, but IP evidence somehow present.
		asset.story_protocol_id = Some("0xabc".into());
		asset.story_protocol_tx_hash = Some("0xdef".into());

		let d = diagnose(&asset);
		assert_eq!(d.failed_step.map(|s| s.step), Some(2));
		assert_eq!(d.recovery_action, Some(RecoveryAction::ReUpload));
	}

	#[test]
	fn missing_ip_registration() {
		let mut asset = bare_asset();
		asset.pinata_cid = Some("Qm123".into());
		asset.pinata_url = Some("https://gateway/ipfs/Qm123".into());
		asset.content_hash = Some("ab".repeat(32));
		asset.watermark_id = Some("DIPP-x-0001".into());
		asset.dippchain_token_id = Some(7);
		asset.dippchain_tx_hash = Some("0x01".into());

		let d = diagnose(&asset);
		assert_eq!(d.failed_step.map(|s| s.step), Some(4));
		assert_eq!(
			d.recovery_action,
			Some(RecoveryAction::RegisterStoryProtocol)
		);
	}

	#[test]
	fn stale_status_is_the_last_check() {
		let mut asset = bare_asset();
		asset.pinata_cid = Some("Qm123".into());
		asset.pinata_url = Some("https://gateway/ipfs/Qm123".into());
		asset.content_hash = Some("ab".repeat(32));
		asset.watermark_id = Some("DIPP-x-0001".into());
		asset.dippchain_token_id = Some(7);
		asset.dippchain_tx_hash = Some("0x01".into());
		asset.story_protocol_id = Some("0xabc".into());
		asset.story_protocol_tx_hash = Some("0xdef".into());

		let d = diagnose(&asset);
		assert_eq!(d.failed_step.map(|s| s.step), Some(5));
		assert_eq!(d.recovery_action, Some(RecoveryAction::UpdateStatus));

		asset.status = AssetStatus::Registered.into();
		let d = diagnose(&asset);
		assert_eq!(d.failed_step, None);
		assert_eq!(d.completed_steps.len(), 5);
	}

	#[test]
	fn diagnosis_is_deterministic() {
		let mut asset = bare_asset();
		asset.pinata_cid = Some("Qm123".into());
		asset.pinata_url = Some("https://gateway/ipfs/Qm123".into());
		let first = diagnose(&asset);
		for _ in 0..10 {
			assert_eq!(diagnose(&asset), first);
		}
	}
}
