// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Trail audit server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`TRAIL_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use trail_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

use std::path::PathBuf;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Upper bound for every `*_secs` setting (one day).
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub query: QueryConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`TRAIL_SERVER_*`)
/// 2. Config file (`/etc/trail/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and finalize.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		query: layer.query.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		max_connections = config.database.max_connections,
		query_timeout_secs = config.query.timeout_secs,
		log_format = %config.logging.format,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.http.port == 0 {
		return Err(ConfigError::Validation(
			"http.port must be non-zero".to_string(),
		));
	}

	let db = &config.database;
	if db.max_connections == 0 {
		return Err(ConfigError::Validation(
			"database.max_connections must be at least 1".to_string(),
		));
	}
	if db.min_connections > db.max_connections {
		return Err(ConfigError::Validation(format!(
			"database.min_connections ({}) exceeds database.max_connections ({})",
			db.min_connections, db.max_connections
		)));
	}

	let timeouts = [
		("database.acquire_timeout_secs", db.acquire_timeout_secs),
		("database.idle_timeout_secs", db.idle_timeout_secs),
		("database.max_lifetime_secs", db.max_lifetime_secs),
		("database.health_interval_secs", db.health_interval_secs),
		("query.timeout_secs", config.query.timeout_secs),
	];
	for (name, value) in timeouts {
		if value == 0 {
			return Err(ConfigError::Validation(format!("{name} must be positive")));
		}
		if value > MAX_DURATION_SECS {
			return Err(ConfigError::Validation(format!(
				"{name} must be at most {MAX_DURATION_SECS} seconds"
			)));
		}
	}

	Ok(())
}
