// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use crate::runtime::MurmurConfig;
use crate::ConfigError;

/// Validate the configuration.
pub fn validate_config(config: &MurmurConfig) -> Result<(), ConfigError> {
	if !matches!(config.server_url.scheme(), "http" | "https") {
		return Err(ConfigError::invalid_value(
			"server_url",
			"scheme must be http or https",
		));
	}
	if !matches!(config.ws_url.scheme(), "ws" | "wss") {
		return Err(ConfigError::invalid_value(
			"ws_url",
			"scheme must be ws or wss",
		));
	}
	if config.reconnect_delay.is_zero() {
		return Err(ConfigError::invalid_value(
			"reconnect_delay_ms",
			"must be greater than zero",
		));
	}
	if config.request_timeout.is_zero() {
		return Err(ConfigError::invalid_value(
			"request_timeout_secs",
			"must be greater than zero",
		));
	}
	if config.session_file.as_os_str().is_empty() {
		return Err(ConfigError::validation("session_file cannot be empty"));
	}

	Ok(())
}
