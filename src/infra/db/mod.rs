//! Database access
//!
//! Connection setup and schema migration on top of sea-orm. SQLite is the
//! only backend we ship; the URL comes from [`crate::config::AppConfig`].

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

pub mod entities;
pub mod migration;

/// Connect to the database and bring the schema up to date.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
	let mut options = ConnectOptions::new(database_url.to_string());
	options.sqlx_logging(false);

	let db = Database::connect(options).await?;
	migration::Migrator::up(&db, None).await?;

	info!("database ready at {database_url}");
	Ok(db)
}
