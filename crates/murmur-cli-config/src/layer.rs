// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use std::path::PathBuf;

use serde::Deserialize;

/// Partial configuration layer - all fields are Option for merging.
///
/// ```toml
/// server_url = "https://murmur.example.com"
/// reconnect_delay_ms = 3000
///
/// [logging]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	#[serde(default)]
	pub server_url: Option<String>,
	#[serde(default)]
	pub ws_url: Option<String>,
	#[serde(default)]
	pub reconnect_delay_ms: Option<u64>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub session_file: Option<PathBuf>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		if other.server_url.is_some() {
			self.server_url = other.server_url;
		}
		if other.ws_url.is_some() {
			self.ws_url = other.ws_url;
		}
		if other.reconnect_delay_ms.is_some() {
			self.reconnect_delay_ms = other.reconnect_delay_ms;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.session_file.is_some() {
			self.session_file = other.session_file;
		}
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}

	pub(crate) fn logging_mut(&mut self) -> &mut LoggingLayer {
		self.logging.get_or_insert_with(LoggingLayer::default)
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
