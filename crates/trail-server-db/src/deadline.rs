// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-operation deadlines for store calls.
//!
//! Every [`EventStore`](crate::EventStore) method takes a [`Deadline`]. When
//! the instant passes, or the optional cancellation token fires, the
//! in-flight query future is dropped, which returns its pooled connection.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{DbError, Result};

/// Longest timeout honoured by [`Deadline::after`]; larger values are clamped.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(86_400 * 365);

#[derive(Debug, Clone)]
pub struct Deadline {
	at: Instant,
	cancel: Option<CancellationToken>,
}

impl Deadline {
	pub fn at(at: Instant) -> Self {
		Self { at, cancel: None }
	}

	pub fn after(timeout: Duration) -> Self {
		Self::at(Instant::now() + timeout.min(MAX_TIMEOUT))
	}

	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = Some(token);
		self
	}

	pub fn instant(&self) -> Instant {
		self.at
	}

	pub fn is_expired(&self) -> bool {
		Instant::now() >= self.at
	}

	/// Drive `operation` until it completes, the deadline passes, or the
	/// token is cancelled. Cancellation wins a tie.
	pub async fn run<T, F>(&self, operation: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let cancelled = async {
			match &self.cancel {
				Some(token) => token.cancelled().await,
				None => std::future::pending().await,
			}
		};

		tokio::select! {
			biased;
			_ = cancelled => Err(DbError::Cancelled),
			outcome = tokio::time::timeout_at(self.at, operation) => match outcome {
				Ok(result) => result,
				Err(_) => Err(DbError::Timeout),
			},
		}
	}
}
