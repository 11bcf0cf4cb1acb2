//! Governance vote entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "governance_votes")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub proposal_id: i32,
	pub voter_id: i32,
	pub choice: i32,
	/// Vote weight at cast time, from the voter's fraction holdings
	pub weight: i64,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::governance_proposal::Entity",
		from = "Column::ProposalId",
		to = "super::governance_proposal::Column::Id"
	)]
	Proposal,
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::VoterId",
		to = "super::user::Column::Id"
	)]
	Voter,
}

impl Related<super::governance_proposal::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Proposal.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
	For = 0,
	Against = 1,
	Abstain = 2,
}

impl From<i32> for VoteChoice {
	fn from(value: i32) -> Self {
		match value {
			1 => VoteChoice::Against,
			2 => VoteChoice::Abstain,
			_ => VoteChoice::For,
		}
	}
}

impl From<VoteChoice> for i32 {
	fn from(choice: VoteChoice) -> Self {
		choice as i32
	}
}
