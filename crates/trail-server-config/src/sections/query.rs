// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store operation deadlines.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
	/// Deadline applied to every store read and write.
	pub timeout_secs: u64,
}

impl QueryConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

impl Default for QueryConfig {
	fn default() -> Self {
		Self {
			timeout_secs: DEFAULT_TIMEOUT_SECS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryConfigLayer {
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl QueryConfigLayer {
	pub fn merge(&mut self, other: QueryConfigLayer) {
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> QueryConfig {
		QueryConfig {
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		}
	}
}
