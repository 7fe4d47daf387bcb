// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, HttpConfigLayer, LogFormat, LoggingConfigLayer, QueryConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/trail/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "no config file");
				return Ok(ServerConfigLayer::default());
			}
			Err(source) => {
				return Err(ConfigError::FileRead {
					path: self.path.clone(),
					source,
				})
			}
		};

		let layer = toml::from_str::<ServerConfigLayer>(&content).map_err(|source| {
			ConfigError::TomlParse {
				path: self.path.clone(),
				source,
			}
		})?;
		trace!(path = %self.path.display(), "config file parsed");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: TRAIL_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		load_from(&Env(|name: &str| std::env::var(name).ok()))
	}
}

/// Variable lookup, so tests can supply a fixed map instead of the process
/// environment.
struct Env<F>(F);

impl<F> Env<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn var(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|s| !s.is_empty())
	}

	fn parse<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid value '{v}': {e}"),
			}),
			None => Ok(None),
		}
	}
}

fn load_from<F>(env: &Env<F>) -> Result<ServerConfigLayer, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	Ok(ServerConfigLayer {
		http: Some(HttpConfigLayer {
			host: env.var("TRAIL_SERVER_HOST"),
			port: env.parse("TRAIL_SERVER_PORT")?,
		}),
		database: Some(DatabaseConfigLayer {
			url: env.var("TRAIL_SERVER_DATABASE_URL"),
			max_connections: env.parse("TRAIL_SERVER_DATABASE_MAX_CONNECTIONS")?,
			min_connections: env.parse("TRAIL_SERVER_DATABASE_MIN_CONNECTIONS")?,
			acquire_timeout_secs: env.parse("TRAIL_SERVER_DATABASE_ACQUIRE_TIMEOUT_SECS")?,
			idle_timeout_secs: env.parse("TRAIL_SERVER_DATABASE_IDLE_TIMEOUT_SECS")?,
			max_lifetime_secs: env.parse("TRAIL_SERVER_DATABASE_MAX_LIFETIME_SECS")?,
			health_interval_secs: env.parse("TRAIL_SERVER_DATABASE_HEALTH_INTERVAL_SECS")?,
		}),
		query: Some(QueryConfigLayer {
			timeout_secs: env.parse("TRAIL_SERVER_QUERY_TIMEOUT_SECS")?,
		}),
		logging: Some(LoggingConfigLayer {
			level: env.var("TRAIL_SERVER_LOG_LEVEL"),
			format: env.parse::<LogFormat>("TRAIL_SERVER_LOG_FORMAT")?,
		}),
	})
}
