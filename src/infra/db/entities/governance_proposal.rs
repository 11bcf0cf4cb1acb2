//! Governance proposal entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "governance_proposals")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub uuid: Uuid,
	pub proposer_id: i32,
	pub title: String,
	pub description: String,
	pub voting_start: DateTimeUtc,
	pub voting_end: DateTimeUtc,
	/// Minimum total weight that must vote for the outcome to bind
	pub quorum: i64,
	pub votes_for: i64,
	pub votes_against: i64,
	pub votes_abstain: i64,
	pub status: i32,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::governance_vote::Entity")]
	Votes,
}

impl Related<super::governance_vote::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Votes.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
	Active = 0,
	Passed = 1,
	Rejected = 2,
	QuorumNotMet = 3,
}

impl From<i32> for ProposalStatus {
	fn from(value: i32) -> Self {
		match value {
			1 => ProposalStatus::Passed,
			2 => ProposalStatus::Rejected,
			3 => ProposalStatus::QuorumNotMet,
			_ => ProposalStatus::Active,
		}
	}
}

impl From<ProposalStatus> for i32 {
	fn from(status: ProposalStatus) -> Self {
		status as i32
	}
}
