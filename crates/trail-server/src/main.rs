// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Trail audit event server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trail_server::{create_app_state, create_router, monitor, version};
use trail_server_config::{LogFormat, ServerConfig};
use trail_server_db::{create_pool, run_migrations, EventRepository, EventStore, PoolSettings};

/// Trail server - append-only audit event store over HTTP.
#[derive(Parser, Debug)]
#[command(name = "trail-server", about = "Trail audit event server", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/trail/server.toml)
	#[arg(long, env = "TRAIL_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

fn init_tracing(config: &ServerConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());

	let (pretty, json) = match config.logging.format {
		LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
		LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(pretty)
		.with(json)
		.init();
}

fn pool_settings(config: &ServerConfig) -> PoolSettings {
	PoolSettings {
		max_connections: config.database.max_connections,
		min_connections: config.database.min_connections,
		acquire_timeout: config.database.acquire_timeout(),
		idle_timeout: config.database.idle_timeout(),
		max_lifetime: config.database.max_lifetime(),
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	tracing::info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => trail_server_config::load_config_with_file(path)?,
		None => trail_server_config::load_config()?,
	};

	init_tracing(&config);
	tracing::info!(version = version::VERSION, "starting trail-server");

	let pool = create_pool(&config.database.url, &pool_settings(&config)).await?;
	run_migrations(&pool).await?;

	let store: Arc<dyn EventStore> = Arc::new(EventRepository::new(pool.clone()));
	let state = create_app_state(Arc::clone(&store), &config)?;

	let cancel = CancellationToken::new();
	let monitor_handle = monitor::spawn_db_monitor(
		store,
		Arc::clone(&state.metrics),
		config.database.health_interval(),
		cancel.clone(),
	);

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	tracing::info!("listening on {}", addr);

	if let Err(e) = axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
	{
		tracing::error!(error = %e, "Server error");
	}

	cancel.cancel();
	if let Err(e) = monitor_handle.await {
		tracing::warn!(error = %e, "database monitor task failed");
	}
	pool.close().await;

	tracing::info!("Server shutdown complete");
	Ok(())
}
