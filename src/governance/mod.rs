//! Governance
//!
//! Token-weighted proposals and voting. A voter's weight is their total
//! fraction-token holding at cast time; the window and the one-vote rule
//! are enforced here, and finalization applies the quorum check.

use chrono::{Duration, Utc};
use sea_orm::prelude::Uuid;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
	QuerySelect, TransactionTrait,
};
use tracing::info;

use crate::common::{CoreError, Result};
use crate::infra::db::entities::{
	fraction_holder, governance_proposal, governance_vote, ProposalStatus, VoteChoice,
};

#[derive(Debug, Clone)]
pub struct NewProposal {
	pub proposer_id: i32,
	pub title: String,
	pub description: String,
	pub voting_days: i64,
	pub quorum: i64,
}

pub struct Governance {
	db: DatabaseConnection,
}

impl Governance {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	pub async fn create_proposal(
		&self,
		proposal: NewProposal,
	) -> Result<governance_proposal::Model> {
		if proposal.title.trim().is_empty() {
			return Err(CoreError::Validation("title is required".into()));
		}
		if proposal.voting_days <= 0 {
			return Err(CoreError::Validation("voting period must be positive".into()));
		}
		if proposal.quorum < 0 {
			return Err(CoreError::Validation("quorum cannot be negative".into()));
		}
		// Proposers must hold at least one fraction token.
		if self.voting_weight(proposal.proposer_id).await? == 0 {
			return Err(CoreError::Conflict(
				"proposer holds no fraction tokens".into(),
			));
		}

		let now = Utc::now();
		let model = governance_proposal::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			proposer_id: Set(proposal.proposer_id),
			title: Set(proposal.title),
			description: Set(proposal.description),
			voting_start: Set(now),
			voting_end: Set(now + Duration::days(proposal.voting_days)),
			quorum: Set(proposal.quorum),
			votes_for: Set(0),
			votes_against: Set(0),
			votes_abstain: Set(0),
			status: Set(ProposalStatus::Active.into()),
			created_at: Set(now),
			..Default::default()
		}
		.insert(&self.db)
		.await?;

		info!(proposal_id = model.id, "proposal created");
		Ok(model)
	}

	/// Cast a vote. Weight is the voter's total holding across all
	/// fractionalizations, snapshotted now.
	pub async fn cast_vote(
		&self,
		proposal_id: i32,
		voter_id: i32,
		choice: VoteChoice,
	) -> Result<governance_vote::Model> {
		let proposal = self.load(proposal_id).await?;
		let now = Utc::now();
		if ProposalStatus::from(proposal.status) != ProposalStatus::Active {
			return Err(CoreError::Conflict("proposal is not active".into()));
		}
		if now < proposal.voting_start || now > proposal.voting_end {
			return Err(CoreError::Conflict("voting window is closed".into()));
		}

		let already = governance_vote::Entity::find()
			.filter(governance_vote::Column::ProposalId.eq(proposal_id))
			.filter(governance_vote::Column::VoterId.eq(voter_id))
			.one(&self.db)
			.await?;
		if already.is_some() {
			return Err(CoreError::Conflict("voter has already voted".into()));
		}

		let weight = self.voting_weight(voter_id).await?;
		if weight == 0 {
			return Err(CoreError::Conflict("voter holds no fraction tokens".into()));
		}

		let txn = self.db.begin().await?;
		let vote = governance_vote::ActiveModel {
			proposal_id: Set(proposal_id),
			voter_id: Set(voter_id),
			choice: Set(choice.into()),
			weight: Set(weight),
			created_at: Set(now),
			..Default::default()
		}
		.insert(&txn)
		.await?;

		let mut active: governance_proposal::ActiveModel = proposal.clone().into();
		match choice {
			VoteChoice::For => active.votes_for = Set(proposal.votes_for + weight),
			VoteChoice::Against => active.votes_against = Set(proposal.votes_against + weight),
			VoteChoice::Abstain => active.votes_abstain = Set(proposal.votes_abstain + weight),
		}
		active.update(&txn).await?;
		txn.commit().await?;

		Ok(vote)
	}

	/// Close a proposal whose window has ended and record the outcome.
	pub async fn finalize(&self, proposal_id: i32) -> Result<governance_proposal::Model> {
		let proposal = self.load(proposal_id).await?;
		if ProposalStatus::from(proposal.status) != ProposalStatus::Active {
			return Ok(proposal);
		}
		if Utc::now() <= proposal.voting_end {
			return Err(CoreError::Conflict("voting window is still open".into()));
		}

		let turnout = proposal.votes_for + proposal.votes_against + proposal.votes_abstain;
		let outcome = if turnout < proposal.quorum {
			ProposalStatus::QuorumNotMet
		} else if proposal.votes_for > proposal.votes_against {
			ProposalStatus::Passed
		} else {
			ProposalStatus::Rejected
		};

		let mut active: governance_proposal::ActiveModel = proposal.into();
		active.status = Set(outcome.into());
		let finalized = active.update(&self.db).await?;
		info!(proposal_id, ?outcome, "proposal finalized");
		Ok(finalized)
	}

	async fn voting_weight(&self, voter_id: i32) -> Result<i64> {
		let holdings: Vec<i64> = fraction_holder::Entity::find()
			.filter(fraction_holder::Column::UserId.eq(voter_id))
			.select_only()
			.column(fraction_holder::Column::Amount)
			.into_tuple()
			.all(&self.db)
			.await?;
		Ok(holdings.into_iter().sum())
	}

	async fn load(&self, proposal_id: i32) -> Result<governance_proposal::Model> {
		governance_proposal::Entity::find_by_id(proposal_id)
			.one(&self.db)
			.await?
			.ok_or_else(|| CoreError::NotFound(format!("proposal {proposal_id}")))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::infra::db::entities::asset::AssetStatus;
	use crate::infra::db::entities::{
		asset, fractionalization, user, FractionalizationStatus, ROYALTY_TOKEN_SUPPLY,
	};

	async fn seed_holder(db: &DatabaseConnection, wallet: &str, amount: i64) -> user::Model {
		let holder = user::ActiveModel {
			uuid: Set(Uuid::new_v4()),
			wallet_address: Set(wallet.into()),
			created_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(db)
		.await
		.unwrap();

		let fractionalization = match fractionalization::Entity::find().one(db).await.unwrap() {
			Some(found) => found,
			None => {
				let asset = asset::ActiveModel {
					uuid: Set(Uuid::new_v4()),
					owner_id: Set(holder.id),
					title: Set("work".into()),
					mime_type: Set("image/png".into()),
					file_size: Set(1),
					registered_on_chain: Set(true),
					status: Set(AssetStatus::Registered.into()),
					created_at: Set(Utc::now()),
					updated_at: Set(Utc::now()),
					..Default::default()
				}
				.insert(db)
				.await
				.unwrap();
				fractionalization::ActiveModel {
					asset_id: Set(asset.id),
					total_supply: Set(ROYALTY_TOKEN_SUPPLY),
					available_supply: Set(ROYALTY_TOKEN_SUPPLY),
					price_per_token: Set(0.001),
					token_address: Set("0xdd".into()),
					status: Set(FractionalizationStatus::Trading.into()),
					created_at: Set(Utc::now()),
					..Default::default()
				}
				.insert(db)
				.await
				.unwrap()
			}
		};

		if amount > 0 {
			fraction_holder::ActiveModel {
				fractionalization_id: Set(fractionalization.id),
				user_id: Set(holder.id),
				amount: Set(amount),
				percentage_owned: Set(fraction_holder::percentage_owned(
					amount,
					ROYALTY_TOKEN_SUPPLY,
				)),
				updated_at: Set(Utc::now()),
				..Default::default()
			}
			.insert(db)
			.await
			.unwrap();
		}
		holder
	}

	fn new_proposal(proposer_id: i32, quorum: i64) -> NewProposal {
		NewProposal {
			proposer_id,
			title: "reduce primary price".into(),
			description: "halve the price per token".into(),
			voting_days: 7,
			quorum,
		}
	}

	#[tokio::test]
	async fn vote_weight_tracks_holdings() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let proposer = seed_holder(&db, "0xaaa", 1_000_000).await;
		let voter = seed_holder(&db, "0xbbb", 250_000).await;

		let governance = Governance::new(db.clone());
		let proposal = governance
			.create_proposal(new_proposal(proposer.id, 0))
			.await
			.unwrap();

		governance
			.cast_vote(proposal.id, voter.id, VoteChoice::For)
			.await
			.unwrap();
		governance
			.cast_vote(proposal.id, proposer.id, VoteChoice::Against)
			.await
			.unwrap();

		let tallied = governance_proposal::Entity::find_by_id(proposal.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(tallied.votes_for, 250_000);
		assert_eq!(tallied.votes_against, 1_000_000);
	}

	#[tokio::test]
	async fn double_voting_is_rejected() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let proposer = seed_holder(&db, "0xaaa", 1_000_000).await;

		let governance = Governance::new(db.clone());
		let proposal = governance
			.create_proposal(new_proposal(proposer.id, 0))
			.await
			.unwrap();

		governance
			.cast_vote(proposal.id, proposer.id, VoteChoice::For)
			.await
			.unwrap();
		let err = governance
			.cast_vote(proposal.id, proposer.id, VoteChoice::For)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn non_holders_cannot_vote() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let proposer = seed_holder(&db, "0xaaa", 1_000_000).await;
		let outsider = seed_holder(&db, "0xccc", 0).await;

		let governance = Governance::new(db.clone());
		let proposal = governance
			.create_proposal(new_proposal(proposer.id, 0))
			.await
			.unwrap();

		let err = governance
			.cast_vote(proposal.id, outsider.id, VoteChoice::For)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn finalize_applies_quorum_then_majority() {
		let db = crate::infra::db::connect("sqlite::memory:").await.unwrap();
		let proposer = seed_holder(&db, "0xaaa", 1_000_000).await;

		let governance = Governance::new(db.clone());
		let proposal = governance
			.create_proposal(new_proposal(proposer.id, 2_000_000))
			.await
			.unwrap();
		governance
			.cast_vote(proposal.id, proposer.id, VoteChoice::For)
			.await
			.unwrap();

		// Finalizing before the window closes is refused.
		let err = governance.finalize(proposal.id).await.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));

		// Close the window manually.
		let row = governance_proposal::Entity::find_by_id(proposal.id)
			.one(&db)
			.await
			.unwrap()
			.unwrap();
		let mut active: governance_proposal::ActiveModel = row.into();
		active.voting_end = Set(Utc::now() - Duration::seconds(1));
		active.update(&db).await.unwrap();

		// 1M turnout < 2M quorum.
		let finalized = governance.finalize(proposal.id).await.unwrap();
		assert_eq!(
			ProposalStatus::from(finalized.status),
			ProposalStatus::QuorumNotMet
		);
	}
}
