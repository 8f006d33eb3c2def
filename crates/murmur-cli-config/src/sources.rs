// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	UserFile = 30,
	ExplicitFile = 40,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
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

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		// Defaults are applied during finalization
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
	required: bool,
}

impl FileSource {
	/// User config: ~/.config/murmur/config.toml. Optional.
	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
			name: "user-config",
			required: false,
		}
	}

	/// File named with `--config`. Must exist.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			path,
			precedence: Precedence::ExplicitFile,
			name: "explicit-config",
			required: true,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.required && !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Io {
			path: self.path.clone(),
			source: e,
		})?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `MURMUR_<FIELD>`, plus `MURMUR_LOG_LEVEL` and
/// `MURMUR_LOG_FORMAT` for the logging section.
pub struct EnvSource {
	vars: Vec<(String, String)>,
}

impl EnvSource {
	/// Snapshot of the process environment.
	pub fn from_env() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: vars
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.filter(|(k, _)| k.starts_with("MURMUR_"))
				.collect(),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let mut layer = ConfigLayer::default();

		for (key, value) in &self.vars {
			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"MURMUR_SERVER_URL" => layer.server_url = Some(value),
				"MURMUR_WS_URL" => layer.ws_url = Some(value),
				"MURMUR_SESSION_FILE" => layer.session_file = Some(PathBuf::from(value)),
				"MURMUR_RECONNECT_DELAY_MS" => match value.parse() {
					Ok(v) => layer.reconnect_delay_ms = Some(v),
					Err(_) => warn!(key = %key, value = %value, "ignoring non-numeric env var"),
				},
				"MURMUR_REQUEST_TIMEOUT_SECS" => match value.parse() {
					Ok(v) => layer.request_timeout_secs = Some(v),
					Err(_) => warn!(key = %key, value = %value, "ignoring non-numeric env var"),
				},
				"MURMUR_LOG_LEVEL" => layer.logging_mut().level = Some(value),
				"MURMUR_LOG_FORMAT" => layer.logging_mut().format = Some(value),
				_ => {
					// Unknown MURMUR_ variable, ignore
				}
			}
		}

		Ok(layer)
	}
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub server_url: Option<String>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();

		if let Some(ref url) = self.overrides.server_url {
			layer.server_url = Some(url.clone());
		}

		if let Some(ref level) = self.overrides.log_level {
			layer.logging_mut().level = Some(level.clone());
		}

		if let Some(ref format) = self.overrides.log_format {
			layer.logging_mut().format = Some(format.clone());
		}

		Ok(layer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Cli > Precedence::Environment);
		assert!(Precedence::Environment > Precedence::ExplicitFile);
		assert!(Precedence::ExplicitFile > Precedence::UserFile);
		assert!(Precedence::UserFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert_eq!(layer, ConfigLayer::default());
	}

	#[test]
	fn test_user_file_missing_returns_empty() {
		let paths = PathsConfig {
			user_config_file: PathBuf::from("/nonexistent/murmur/config.toml"),
		};
		let layer = FileSource::user(&paths).load().unwrap();
		assert_eq!(layer, ConfigLayer::default());
	}

	#[test]
	fn test_explicit_file_missing_is_an_error() {
		let source = FileSource::explicit(PathBuf::from("/nonexistent/murmur.toml"));
		assert!(matches!(source.load(), Err(ConfigError::Io { .. })));
	}

	#[test]
	fn test_file_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "server_url = ").unwrap();

		let source = FileSource::explicit(file.path().to_path_buf());
		assert!(matches!(source.load(), Err(ConfigError::TomlParse { .. })));
	}

	#[test]
	fn test_env_source_maps_known_vars() {
		let layer = EnvSource::from_vars([
			("MURMUR_SERVER_URL", "https://murmur.example.com"),
			("MURMUR_RECONNECT_DELAY_MS", "1500"),
			("MURMUR_LOG_FORMAT", "json"),
			("MURMUR_UNKNOWN", "ignored"),
			("PATH", "/usr/bin"),
		])
		.load()
		.unwrap();

		assert_eq!(layer.server_url.as_deref(), Some("https://murmur.example.com"));
		assert_eq!(layer.reconnect_delay_ms, Some(1500));
		assert_eq!(layer.logging.unwrap().format.as_deref(), Some("json"));
	}

	#[test]
	fn test_env_source_skips_bad_numbers_and_blanks() {
		let layer = EnvSource::from_vars([
			("MURMUR_REQUEST_TIMEOUT_SECS", "soon"),
			("MURMUR_WS_URL", "   "),
		])
		.load()
		.unwrap();

		assert_eq!(layer.request_timeout_secs, None);
		assert_eq!(layer.ws_url, None);
	}

	#[test]
	fn test_cli_source_sets_overrides() {
		let layer = CliSource::new(CliOverrides {
			server_url: Some("http://localhost:9000".to_string()),
			log_level: Some("trace".to_string()),
			..Default::default()
		})
		.load()
		.unwrap();

		assert_eq!(layer.server_url.as_deref(), Some("http://localhost:9000"));
		assert_eq!(layer.logging.unwrap().level.as_deref(), Some("trace"));
	}
}
