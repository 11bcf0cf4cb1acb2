//! Sentinel infringement detection
//!
//! Two detection surfaces: a library scan that checks one protected asset
//! against every other registered asset in the catalog, and a suspect-file
//! check that fingerprints arbitrary bytes against the catalog. Matches are
//! persisted as alerts with a severity derived from similarity and whether
//! the embedded watermark survived.

use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::common::{CoreError, Result};
use crate::content::{hash, watermark};
use crate::infra::db::entities::{asset, sentinel_alert, sentinel_scan, ScanStatus, Severity};

/// A suspect file's match against a catalog asset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspectMatch {
	pub asset_id: i32,
	pub similarity: f64,
	pub watermark_match: bool,
	pub severity: Severity,
}

#[derive(Debug)]
pub struct ScanReport {
	pub scan: sentinel_scan::Model,
	pub alerts: Vec<sentinel_alert::Model>,
}

/// Severity from match evidence. A surviving watermark is treated as strong
/// evidence regardless of byte similarity, since re-encoding changes the
/// hash but not the embedded id.
pub fn classify(similarity: f64, watermark_match: bool) -> Severity {
	if similarity >= 0.95 && watermark_match {
		Severity::Critical
	} else if similarity >= 0.95 || watermark_match {
		Severity::High
	} else if similarity >= 0.6 {
		Severity::Medium
	} else {
		Severity::Low
	}
}

pub struct Sentinel {
	db: DatabaseConnection,
}

impl Sentinel {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	/// Scan one protected asset against the rest of the catalog, persisting
	/// a scan record and one alert per match.
	pub async fn scan_asset(&self, asset_id: i32) -> Result<ScanReport> {
		let protected = asset::Entity::find_by_id(asset_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("asset {asset_id}")))?;

		let scan = sentinel_scan::ActiveModel {
			asset_id: Set(asset_id),
			status: Set(ScanStatus::Running.into()),
			matches_found: Set(0),
			started_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(&self.db)
		.await?;

		let Some(content_hash) = protected.content_hash.clone() else {
			warn!(asset_id, "asset has no content hash, nothing to scan against");
			return self.finish(scan, vec![]).await;
		};

		let others = asset::Entity::find()
			.filter(asset::Column::Id.ne(asset_id))
			.filter(asset::Column::ContentHash.is_not_null())
			.all(&self.db)
			.await?;

		let mut alerts = Vec::new();
		for other in others {
			let exact = other.content_hash.as_deref() == Some(content_hash.as_str());
			let watermark_match = protected.watermark_id.is_some()
				&& other.watermark_id == protected.watermark_id;
			// A re-encoded copy keeps the watermark but not the hash.
			let similarity = if exact { 1.0 } else if watermark_match { 0.9 } else { continue };

			let alert = sentinel_alert::ActiveModel {
				scan_id: Set(scan.id),
				asset_id: Set(asset_id),
				matched_asset_id: Set(other.id),
				similarity: Set(similarity),
				watermark_match: Set(watermark_match),
				severity: Set(classify(similarity, watermark_match).into()),
				created_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(&self.db)
			.await?;
			alerts.push(alert);
		}

		info!(asset_id, matches = alerts.len(), "sentinel scan finished");
		self.finish(scan, alerts).await
	}

	/// Check suspect bytes against the catalog without persisting anything.
	pub async fn check_bytes(&self, suspect: &[u8], mime_type: &str) -> Result<Vec<SuspectMatch>> {
		if suspect.is_empty() {
			return Err(CoreError::Validation("suspect file is empty".into()));
		}
		let suspect_hash = hash::sha256_hex(suspect);
		let image = mime_type
			.starts_with("image/")
			.then(|| image::load_from_memory(suspect).ok())
			.flatten();

		let catalog = asset::Entity::find()
			.filter(asset::Column::ContentHash.is_not_null())
			.all(&self.db)
			.await?;

		let mut matches = Vec::new();
		for asset in catalog {
			let exact = asset.content_hash.as_deref() == Some(suspect_hash.as_str());
			let watermark_match = match (&image, &asset.watermark_id) {
				(Some(image), Some(id)) => watermark::extract(image, id.len()) == *id,
				_ => false,
			};
			if !exact && !watermark_match {
				continue;
			}
			let similarity = if exact { 1.0 } else { 0.9 };
			matches.push(SuspectMatch {
				asset_id: asset.id,
				similarity,
				watermark_match,
				severity: classify(similarity, watermark_match),
			});
		}
		Ok(matches)
	}

	async fn finish(
		&self,
		scan: sentinel_scan::Model,
		alerts: Vec<sentinel_alert::Model>,
	) -> Result<ScanReport> {
		let mut active: sentinel_scan::ActiveModel = scan.into();
		active.status = Set(ScanStatus::Completed.into());
		active.matches_found = Set(alerts.len() as i32);
		active.finished_at = Set(Some(Utc::now()));
		let scan = active.update(&self.db).await?;
		Ok(ScanReport { scan, alerts })
	}
}
