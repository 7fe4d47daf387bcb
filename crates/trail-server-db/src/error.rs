// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Database operation timed out")]
	Timeout,

	#[error("Database operation cancelled")]
	Cancelled,

	#[error("Invalid stored event: {0}")]
	Decode(String),

	#[error("Migration {name} failed: {source}")]
	Migration {
		name: &'static str,
		#[source]
		source: sqlx::Error,
	},

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
