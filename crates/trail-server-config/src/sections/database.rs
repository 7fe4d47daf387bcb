// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database connection and pool configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_URL: &str = "sqlite:./trail.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_MIN_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_LIFETIME_SECS: u64 = 300;
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

/// Database configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
	pub url: String,
	pub max_connections: u32,
	pub min_connections: u32,
	pub acquire_timeout_secs: u64,
	pub idle_timeout_secs: u64,
	pub max_lifetime_secs: u64,
	/// Interval between background liveness pings.
	pub health_interval_secs: u64,
}

impl DatabaseConfig {
	pub fn acquire_timeout(&self) -> Duration {
		Duration::from_secs(self.acquire_timeout_secs)
	}

	pub fn idle_timeout(&self) -> Duration {
		Duration::from_secs(self.idle_timeout_secs)
	}

	pub fn max_lifetime(&self) -> Duration {
		Duration::from_secs(self.max_lifetime_secs)
	}

	pub fn health_interval(&self) -> Duration {
		Duration::from_secs(self.health_interval_secs)
	}
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		DatabaseConfigLayer::default().finalize()
	}
}

/// Database configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub max_connections: Option<u32>,
	#[serde(default)]
	pub min_connections: Option<u32>,
	#[serde(default)]
	pub acquire_timeout_secs: Option<u64>,
	#[serde(default)]
	pub idle_timeout_secs: Option<u64>,
	#[serde(default)]
	pub max_lifetime_secs: Option<u64>,
	#[serde(default)]
	pub health_interval_secs: Option<u64>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.max_connections.is_some() {
			self.max_connections = other.max_connections;
		}
		if other.min_connections.is_some() {
			self.min_connections = other.min_connections;
		}
		if other.acquire_timeout_secs.is_some() {
			self.acquire_timeout_secs = other.acquire_timeout_secs;
		}
		if other.idle_timeout_secs.is_some() {
			self.idle_timeout_secs = other.idle_timeout_secs;
		}
		if other.max_lifetime_secs.is_some() {
			self.max_lifetime_secs = other.max_lifetime_secs;
		}
		if other.health_interval_secs.is_some() {
			self.health_interval_secs = other.health_interval_secs;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
			max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
			min_connections: self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS),
			acquire_timeout_secs: self
				.acquire_timeout_secs
				.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
			idle_timeout_secs: self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
			max_lifetime_secs: self.max_lifetime_secs.unwrap_or(DEFAULT_MAX_LIFETIME_SECS),
			health_interval_secs: self
				.health_interval_secs
				.unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = DatabaseConfigLayer::default().finalize();
		assert_eq!(config.url, "sqlite:./trail.db");
		assert_eq!(config.max_connections, 25);
		assert_eq!(config.min_connections, 5);
		assert_eq!(config.idle_timeout(), Duration::from_secs(120));
		assert_eq!(config.max_lifetime(), Duration::from_secs(300));
		assert_eq!(config.health_interval(), Duration::from_secs(30));
	}

	#[test]
	fn test_partial_toml() {
		let layer: DatabaseConfigLayer = toml::from_str(
			r#"
url = "sqlite:/var/lib/trail/audit.db"
max_connections = 10
"#,
		)
		.unwrap();
		let config = layer.finalize();
		assert_eq!(config.url, "sqlite:/var/lib/trail/audit.db");
		assert_eq!(config.max_connections, 10);
		assert_eq!(config.min_connections, 5);
	}
}
