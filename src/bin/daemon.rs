use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use dippchain_core::config::{AppConfig, Secrets};
use dippchain_core::{api, init_logging, Core};

#[derive(Parser)]
#[command(name = "dippchaind", about = "DippChain backend daemon")]
struct Args {
	/// Data directory for config, database and logs
	#[arg(long, env = "DIPPCHAIN_DATA_DIR", default_value = "./dippchain_data")]
	data_dir: PathBuf,

	/// Override the configured listen port
	#[arg(long, env = "PORT")]
	port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	std::fs::create_dir_all(&args.data_dir)?;

	let mut config = AppConfig::load_from(&args.data_dir)?;
	if let Some(port) = args.port {
		config.port = port;
	}
	config.validate()?;

	std::fs::create_dir_all(config.logs_dir())?;
	let _guard = init_logging(&config.logs_dir(), &config.log_level)?;

	let secrets = Secrets::from_env()?;
	let core = Core::new(&config, &secrets).await?;

	tokio::spawn(core.outbox.run());

	let app = api::router(core.state);
	let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
	info!("listening on {addr}");

	axum::Server::bind(&addr)
		.serve(app.into_make_service())
		.with_graceful_shutdown(shutdown_signal())
		.await?;
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("failed to listen for shutdown signal: {e}");
		return;
	}
	info!("shutdown signal received");
}
