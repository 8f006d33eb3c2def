// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Resolved XDG paths for Murmur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
	/// User config file: ~/.config/murmur/config.toml
	pub user_config_file: PathBuf,
}

impl PathsConfig {
	/// Paths rooted at an explicit config home, e.g. `~/.config`.
	pub fn under(config_home: &Path) -> Self {
		Self {
			user_config_file: config_home.join("murmur/config.toml"),
		}
	}

	/// Get the config directory (parent of user_config_file)
	pub fn config_dir(&self) -> PathBuf {
		self
			.user_config_file
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| self.user_config_file.clone())
	}

	/// Default location of the persisted session.
	pub fn session_file(&self) -> PathBuf {
		self.config_dir().join("session.json")
	}
}

/// Resolve XDG paths according to the Base Directory Specification.
///
/// Uses `XDG_CONFIG_HOME` if set, otherwise `~/.config`.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
		Some(dir) if !dir.is_empty() => PathBuf::from(dir),
		_ => dirs::home_dir()
			.ok_or(ConfigError::HomeDirNotFound)?
			.join(".config"),
	};

	tracing::debug!(config_home = %config_home.display(), "resolved XDG paths");

	Ok(PathsConfig::under(&config_home))
}
