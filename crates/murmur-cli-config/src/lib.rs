// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the Murmur CLI.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides
//! - Configuration validation

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use error::ConfigError;
pub use layer::{ConfigLayer, LoggingLayer};
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{derive_ws_url, LogFormat, LogLevel, LoggingConfig, MurmurConfig};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration with CLI overrides.
///
/// Precedence, lowest first: defaults, `~/.config/murmur/config.toml`, the
/// file named by `--config`, `MURMUR_*` environment variables, CLI flags.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<MurmurConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	if let Some(ref path) = cli.config_file {
		registry.register(Box::new(sources::FileSource::explicit(path.clone())));
	}
	registry.register(Box::new(sources::EnvSource::from_env()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
