// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::layer::{ConfigLayer, LoggingLayer};
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// The final, validated configuration for the Murmur CLI.
#[derive(Debug, Clone)]
pub struct MurmurConfig {
	pub server_url: Url,
	/// Push channel endpoint. Derived from `server_url` unless set.
	pub ws_url: Url,
	pub reconnect_delay: Duration,
	pub request_timeout: Duration,
	pub session_file: PathBuf,
	pub logging: LoggingConfig,

	/// Resolved XDG paths
	pub paths: PathsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	Pretty,
	#[default]
	Compact,
	Json,
}

impl MurmurConfig {
	/// Resolve a merged layer into a runtime config, filling defaults.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		let server_url = parse_url(
			"server_url",
			layer.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL),
		)?;

		let ws_url = match layer.ws_url.as_deref() {
			Some(raw) => parse_url("ws_url", raw)?,
			None => derive_ws_url(&server_url)?,
		};

		Ok(Self {
			ws_url,
			server_url,
			reconnect_delay: Duration::from_millis(
				layer.reconnect_delay_ms.unwrap_or(DEFAULT_RECONNECT_DELAY_MS),
			),
			request_timeout: Duration::from_secs(
				layer
					.request_timeout_secs
					.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
			),
			session_file: layer.session_file.unwrap_or_else(|| paths.session_file()),
			logging: build_logging_config(layer.logging)?,
			paths,
		})
	}
}

/// The push endpoint that pairs with `server_url`: same host, `ws`/`wss`
/// scheme, path `/ws`.
pub fn derive_ws_url(server_url: &Url) -> Result<Url, ConfigError> {
	let scheme = match server_url.scheme() {
		"http" => "ws",
		"https" => "wss",
		other => {
			return Err(ConfigError::invalid_value(
				"server_url",
				format!("cannot derive a push URL from scheme '{other}'"),
			))
		}
	};

	let mut ws_url = server_url.clone();
	ws_url
		.set_scheme(scheme)
		.map_err(|_| ConfigError::invalid_value("ws_url", "could not set websocket scheme"))?;
	ws_url.set_path("/ws");
	ws_url.set_query(None);
	ws_url.set_fragment(None);
	Ok(ws_url)
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|e| ConfigError::invalid_value(field, e.to_string()))
}

fn build_logging_config(layer: Option<LoggingLayer>) -> Result<LoggingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(LoggingConfig {
		level: parse_log_level(layer.level.as_deref())?,
		format: parse_log_format(layer.format.as_deref())?,
	})
}

fn parse_log_level(s: Option<&str>) -> Result<LogLevel, ConfigError> {
	match s.map(str::to_ascii_lowercase).as_deref() {
		None => Ok(LogLevel::default()),
		Some("error") => Ok(LogLevel::Error),
		Some("warn") => Ok(LogLevel::Warn),
		Some("info") => Ok(LogLevel::Info),
		Some("debug") => Ok(LogLevel::Debug),
		Some("trace") => Ok(LogLevel::Trace),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.level",
			format!("unknown level '{other}'"),
		)),
	}
}

fn parse_log_format(s: Option<&str>) -> Result<LogFormat, ConfigError> {
	match s.map(str::to_ascii_lowercase).as_deref() {
		None => Ok(LogFormat::default()),
		Some("pretty") => Ok(LogFormat::Pretty),
		Some("compact") => Ok(LogFormat::Compact),
		Some("json") => Ok(LogFormat::Json),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.format",
			format!("unknown format '{other}'"),
		)),
	}
}
