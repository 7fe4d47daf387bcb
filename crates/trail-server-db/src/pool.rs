// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::error::DbError;

/// Connection pool sizing and lifetimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
	pub max_connections: u32,
	pub min_connections: u32,
	pub acquire_timeout: Duration,
	pub idle_timeout: Duration,
	pub max_lifetime: Duration,
}

impl Default for PoolSettings {
	fn default() -> Self {
		Self {
			max_connections: 25,
			min_connections: 5,
			acquire_timeout: Duration::from_secs(5),
			idle_timeout: Duration::from_secs(120),
			max_lifetime: Duration::from_secs(300),
		}
	}
}

/// Create a SqlitePool with WAL mode and the given sizing.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./trail.db")
/// * `settings` - pool sizing and connection lifetimes
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid, or `DbError::Sqlx` if
/// the initial connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.busy_timeout(settings.acquire_timeout)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(settings.max_connections)
		.min_connections(settings.min_connections)
		.acquire_timeout(settings.acquire_timeout)
		.idle_timeout(Some(settings.idle_timeout))
		.max_lifetime(Some(settings.max_lifetime))
		.connect_with(options)
		.await?;

	tracing::debug!(
		max_connections = settings.max_connections,
		min_connections = settings.min_connections,
		"database pool created"
	);
	Ok(pool)
}
