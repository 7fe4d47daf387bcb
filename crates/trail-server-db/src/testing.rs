// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Single-connection in-memory pool; every connection to `:memory:` is its own
/// database, so the pool must never open a second one.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:").unwrap();
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.unwrap()
}

pub async fn create_event_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	crate::migrate::run_migrations(&pool).await.unwrap();
	pool
}
