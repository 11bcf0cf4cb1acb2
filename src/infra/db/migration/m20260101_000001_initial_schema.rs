//! Initial database schema
//!
//! Creates every table: users, assets, fractionalizations and holders, the
//! marketplace (listings, orders, revenues, transfer outbox), sentinel scan
//! records and governance.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(Users::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Users::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Users::Uuid).uuid().not_null().unique_key())
					.col(
						ColumnDef::new(Users::WalletAddress)
							.string()
							.not_null()
							.unique_key(),
					)
					.col(ColumnDef::new(Users::DisplayName).string())
					.col(
						ColumnDef::new(Users::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Assets::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Assets::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Assets::Uuid).uuid().not_null().unique_key())
					.col(ColumnDef::new(Assets::OwnerId).integer().not_null())
					.col(ColumnDef::new(Assets::Title).string().not_null())
					.col(ColumnDef::new(Assets::Description).string())
					.col(ColumnDef::new(Assets::MimeType).string().not_null())
					.col(ColumnDef::new(Assets::FileSize).big_integer().not_null())
					.col(ColumnDef::new(Assets::ContentHash).string())
					.col(ColumnDef::new(Assets::WatermarkId).string())
					.col(ColumnDef::new(Assets::PinataCid).string())
					.col(ColumnDef::new(Assets::PinataUrl).string())
					.col(ColumnDef::new(Assets::ThumbnailCid).string())
					.col(ColumnDef::new(Assets::ThumbnailUrl).string())
					.col(ColumnDef::new(Assets::MetadataHash).string())
					.col(ColumnDef::new(Assets::MetadataCid).string())
					.col(ColumnDef::new(Assets::MetadataUrl).string())
					.col(ColumnDef::new(Assets::DippchainTokenId).big_integer())
					.col(ColumnDef::new(Assets::DippchainTxHash).string())
					.col(
						ColumnDef::new(Assets::RegisteredOnChain)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(ColumnDef::new(Assets::StoryProtocolId).string())
					.col(ColumnDef::new(Assets::StoryProtocolTxHash).string())
					.col(ColumnDef::new(Assets::StoryNftTokenId).big_integer())
					.col(ColumnDef::new(Assets::StoryNftContract).string())
					.col(ColumnDef::new(Assets::LicenseTermsId).big_integer())
					.col(ColumnDef::new(Assets::RoyaltyVaultAddress).string())
					.col(ColumnDef::new(Assets::Status).integer().not_null().default(0))
					.col(
						ColumnDef::new(Assets::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Assets::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(Assets::Table, Assets::OwnerId)
							.to(Users::Table, Users::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_assets_content_hash")
					.table(Assets::Table)
					.col(Assets::ContentHash)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Fractionalizations::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Fractionalizations::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(Fractionalizations::AssetId)
							.integer()
							.not_null()
							.unique_key(),
					)
					.col(
						ColumnDef::new(Fractionalizations::TotalSupply)
							.big_integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(Fractionalizations::AvailableSupply)
							.big_integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(Fractionalizations::PricePerToken)
							.double()
							.not_null(),
					)
					.col(
						ColumnDef::new(Fractionalizations::TokenAddress)
							.string()
							.not_null(),
					)
					.col(
						ColumnDef::new(Fractionalizations::Status)
							.integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(Fractionalizations::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(Fractionalizations::Table, Fractionalizations::AssetId)
							.to(Assets::Table, Assets::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(FractionHolders::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(FractionHolders::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(FractionHolders::FractionalizationId)
							.integer()
							.not_null(),
					)
					.col(ColumnDef::new(FractionHolders::UserId).integer().not_null())
					.col(ColumnDef::new(FractionHolders::Amount).big_integer().not_null())
					.col(
						ColumnDef::new(FractionHolders::PercentageOwned)
							.double()
							.not_null(),
					)
					.col(
						ColumnDef::new(FractionHolders::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(FractionHolders::Table, FractionHolders::FractionalizationId)
							.to(Fractionalizations::Table, Fractionalizations::Id),
					)
					.foreign_key(
						ForeignKey::create()
							.from(FractionHolders::Table, FractionHolders::UserId)
							.to(Users::Table, Users::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_fraction_holders_unique")
					.table(FractionHolders::Table)
					.col(FractionHolders::FractionalizationId)
					.col(FractionHolders::UserId)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(MarketplaceListings::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(MarketplaceListings::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(MarketplaceListings::FractionalizationId)
							.integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(MarketplaceListings::SellerId)
							.integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(MarketplaceListings::Amount)
							.big_integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(MarketplaceListings::Remaining)
							.big_integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(MarketplaceListings::PricePerToken)
							.double()
							.not_null(),
					)
					.col(
						ColumnDef::new(MarketplaceListings::Status)
							.integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(MarketplaceListings::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(
								MarketplaceListings::Table,
								MarketplaceListings::FractionalizationId,
							)
							.to(Fractionalizations::Table, Fractionalizations::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Orders::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Orders::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Orders::Uuid).uuid().not_null().unique_key())
					.col(
						ColumnDef::new(Orders::FractionalizationId)
							.integer()
							.not_null(),
					)
					.col(ColumnDef::new(Orders::ListingId).integer())
					.col(ColumnDef::new(Orders::BuyerId).integer().not_null())
					.col(ColumnDef::new(Orders::SellerId).integer())
					.col(ColumnDef::new(Orders::Amount).big_integer().not_null())
					.col(ColumnDef::new(Orders::PricePerToken).double().not_null())
					.col(ColumnDef::new(Orders::TotalPrice).double().not_null())
					.col(ColumnDef::new(Orders::PaymentTxHash).string().not_null())
					.col(ColumnDef::new(Orders::TransferTxHash).string())
					.col(ColumnDef::new(Orders::Kind).integer().not_null())
					.col(ColumnDef::new(Orders::Status).integer().not_null().default(0))
					.col(
						ColumnDef::new(Orders::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Orders::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(Orders::Table, Orders::FractionalizationId)
							.to(Fractionalizations::Table, Fractionalizations::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Revenues::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Revenues::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Revenues::UserId).integer().not_null())
					.col(ColumnDef::new(Revenues::OrderId).integer().not_null())
					.col(ColumnDef::new(Revenues::Amount).double().not_null())
					.col(ColumnDef::new(Revenues::Source).integer().not_null())
					.col(
						ColumnDef::new(Revenues::Claimed)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(
						ColumnDef::new(Revenues::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(Revenues::Table, Revenues::OrderId)
							.to(Orders::Table, Orders::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(TransferTasks::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(TransferTasks::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(TransferTasks::OrderId)
							.integer()
							.not_null()
							.unique_key(),
					)
					.col(ColumnDef::new(TransferTasks::TokenAddress).string().not_null())
					.col(ColumnDef::new(TransferTasks::Recipient).string().not_null())
					.col(ColumnDef::new(TransferTasks::Amount).big_integer().not_null())
					.col(
						ColumnDef::new(TransferTasks::Status)
							.integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(TransferTasks::Attempts)
							.integer()
							.not_null()
							.default(0),
					)
					.col(ColumnDef::new(TransferTasks::LastError).string())
					.col(
						ColumnDef::new(TransferTasks::NextAttemptAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(TransferTasks::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(TransferTasks::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(TransferTasks::Table, TransferTasks::OrderId)
							.to(Orders::Table, Orders::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(SentinelScans::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(SentinelScans::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(SentinelScans::AssetId).integer().not_null())
					.col(
						ColumnDef::new(SentinelScans::Status)
							.integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(SentinelScans::MatchesFound)
							.integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(SentinelScans::StartedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(ColumnDef::new(SentinelScans::FinishedAt).timestamp_with_time_zone())
					.col(ColumnDef::new(SentinelScans::Error).string())
					.foreign_key(
						ForeignKey::create()
							.from(SentinelScans::Table, SentinelScans::AssetId)
							.to(Assets::Table, Assets::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(SentinelAlerts::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(SentinelAlerts::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(SentinelAlerts::ScanId).integer().not_null())
					.col(ColumnDef::new(SentinelAlerts::AssetId).integer().not_null())
					.col(
						ColumnDef::new(SentinelAlerts::MatchedAssetId)
							.integer()
							.not_null(),
					)
					.col(ColumnDef::new(SentinelAlerts::Similarity).double().not_null())
					.col(
						ColumnDef::new(SentinelAlerts::WatermarkMatch)
							.boolean()
							.not_null(),
					)
					.col(ColumnDef::new(SentinelAlerts::Severity).integer().not_null())
					.col(
						ColumnDef::new(SentinelAlerts::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(SentinelAlerts::Table, SentinelAlerts::ScanId)
							.to(SentinelScans::Table, SentinelScans::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(GovernanceProposals::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(GovernanceProposals::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(GovernanceProposals::Uuid)
							.uuid()
							.not_null()
							.unique_key(),
					)
					.col(
						ColumnDef::new(GovernanceProposals::ProposerId)
							.integer()
							.not_null(),
					)
					.col(ColumnDef::new(GovernanceProposals::Title).string().not_null())
					.col(
						ColumnDef::new(GovernanceProposals::Description)
							.string()
							.not_null(),
					)
					.col(
						ColumnDef::new(GovernanceProposals::VotingStart)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(GovernanceProposals::VotingEnd)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(ColumnDef::new(GovernanceProposals::Quorum).big_integer().not_null())
					.col(
						ColumnDef::new(GovernanceProposals::VotesFor)
							.big_integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(GovernanceProposals::VotesAgainst)
							.big_integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(GovernanceProposals::VotesAbstain)
							.big_integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(GovernanceProposals::Status)
							.integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(GovernanceProposals::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(GovernanceVotes::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(GovernanceVotes::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(GovernanceVotes::ProposalId)
							.integer()
							.not_null(),
					)
					.col(ColumnDef::new(GovernanceVotes::VoterId).integer().not_null())
					.col(ColumnDef::new(GovernanceVotes::Choice).integer().not_null())
					.col(ColumnDef::new(GovernanceVotes::Weight).big_integer().not_null())
					.col(
						ColumnDef::new(GovernanceVotes::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.from(GovernanceVotes::Table, GovernanceVotes::ProposalId)
							.to(GovernanceProposals::Table, GovernanceProposals::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_governance_votes_unique")
					.table(GovernanceVotes::Table)
					.col(GovernanceVotes::ProposalId)
					.col(GovernanceVotes::VoterId)
					.unique()
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		for table in [
			"governance_votes",
			"governance_proposals",
			"sentinel_alerts",
			"sentinel_scans",
			"transfer_tasks",
			"revenues",
			"orders",
			"marketplace_listings",
			"fraction_holders",
			"fractionalizations",
			"assets",
			"users",
		] {
			manager
				.drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
				.await?;
		}
		Ok(())
	}
}

#[derive(Iden)]
enum Users {
	Table,
	Id,
	Uuid,
	WalletAddress,
	DisplayName,
	CreatedAt,
}

#[derive(Iden)]
enum Assets {
	Table,
	Id,
	Uuid,
	OwnerId,
	Title,
	Description,
	MimeType,
	FileSize,
	ContentHash,
	WatermarkId,
	PinataCid,
	PinataUrl,
	ThumbnailCid,
	ThumbnailUrl,
	MetadataHash,
	MetadataCid,
	MetadataUrl,
	DippchainTokenId,
	DippchainTxHash,
	RegisteredOnChain,
	StoryProtocolId,
	StoryProtocolTxHash,
	StoryNftTokenId,
	StoryNftContract,
	LicenseTermsId,
	RoyaltyVaultAddress,
	Status,
	CreatedAt,
	UpdatedAt,
}

#[derive(Iden)]
enum Fractionalizations {
	Table,
	Id,
	AssetId,
	TotalSupply,
	AvailableSupply,
	PricePerToken,
	TokenAddress,
	Status,
	CreatedAt,
}

#[derive(Iden)]
enum FractionHolders {
	Table,
	Id,
	FractionalizationId,
	UserId,
	Amount,
	PercentageOwned,
	UpdatedAt,
}

#[derive(Iden)]
enum MarketplaceListings {
	Table,
	Id,
	FractionalizationId,
	SellerId,
	Amount,
	Remaining,
	PricePerToken,
	Status,
	CreatedAt,
}

#[derive(Iden)]
enum Orders {
	Table,
	Id,
	Uuid,
	FractionalizationId,
	ListingId,
	BuyerId,
	SellerId,
	Amount,
	PricePerToken,
	TotalPrice,
	PaymentTxHash,
	TransferTxHash,
	Kind,
	Status,
	CreatedAt,
	UpdatedAt,
}

#[derive(Iden)]
enum Revenues {
	Table,
	Id,
	UserId,
	OrderId,
	Amount,
	Source,
	Claimed,
	CreatedAt,
}

#[derive(Iden)]
enum TransferTasks {
	Table,
	Id,
	OrderId,
	TokenAddress,
	Recipient,
	Amount,
	Status,
	Attempts,
	LastError,
	NextAttemptAt,
	CreatedAt,
	UpdatedAt,
}

#[derive(Iden)]
enum SentinelScans {
	Table,
	Id,
	AssetId,
	Status,
	MatchesFound,
	StartedAt,
	FinishedAt,
	Error,
}

#[derive(Iden)]
enum SentinelAlerts {
	Table,
	Id,
	ScanId,
	AssetId,
	MatchedAssetId,
	Similarity,
	WatermarkMatch,
	Severity,
	CreatedAt,
}

#[derive(Iden)]
enum GovernanceProposals {
	Table,
	Id,
	Uuid,
	ProposerId,
	Title,
	Description,
	VotingStart,
	VotingEnd,
	Quorum,
	VotesFor,
	VotesAgainst,
	VotesAbstain,
	Status,
	CreatedAt,
}

#[derive(Iden)]
enum GovernanceVotes {
	Table,
	Id,
	ProposalId,
	VoterId,
	Choice,
	Weight,
	CreatedAt,
}
