// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema migrations.
//!
//! Each file is a batch of idempotent statements (`IF NOT EXISTS`), so
//! running the full list at every startup is safe.

use sqlx::sqlite::SqlitePool;

use crate::error::{DbError, Result};

const MIGRATIONS: &[(&str, &str)] = &[(
	"001_create_audit_events",
	include_str!("../migrations/001_create_audit_events.sql"),
)];

/// Apply all migrations in order.
///
/// # Errors
/// Returns `DbError::Migration` naming the first migration that failed.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for &(name, sql) in MIGRATIONS {
		sqlx::raw_sql(sql)
			.execute(pool)
			.await
			.map_err(|source| DbError::Migration { name, source })?;
		tracing::debug!(migration = name, "migration applied");
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn test_migrations_are_idempotent() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		let count: i64 = sqlx::query_scalar(
			"SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'audit_events' \
			 AND name LIKE 'idx_audit_events_%'",
		)
		.fetch_one(&pool)
		.await
		.unwrap();
		assert_eq!(count, 3);
	}

	#[tokio::test]
	async fn test_events_are_append_only() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		sqlx::query(
			"INSERT INTO audit_events (timestamp, user_id, operation, created_at) \
			 VALUES ('2024-01-01T00:00:00.000000Z', 'alice', 'login', '2024-01-01T00:00:00.000000Z')",
		)
		.execute(&pool)
		.await
		.unwrap();

		let update = sqlx::query("UPDATE audit_events SET user_id = 'mallory'")
			.execute(&pool)
			.await;
		assert!(update.is_err());

		let delete = sqlx::query("DELETE FROM audit_events").execute(&pool).await;
		assert!(delete.is_err());
	}
}
