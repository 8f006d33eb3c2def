// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable token storage backends.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::token::Token;

/// Backend holding the single persisted session token.
///
/// Reads are synchronous so the session can answer "who am I" without an
/// await point. `Ok(None)` means no token is stored.
pub trait TokenStorage: Send + Sync + std::fmt::Debug {
	fn load(&self) -> Result<Option<Token>, StorageError>;

	fn save(&self, token: &Token) -> Result<(), StorageError>;

	fn delete(&self) -> Result<(), StorageError>;
}

/// On-disk session document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	token: Option<String>,
}

/// JSON file storage, written with restricted permissions (0600 on Unix).
///
/// A missing file, or a document without a `token` field, reads as
/// unauthenticated. An empty `token` string is treated the same way.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
	path: PathBuf,
}

impl FileTokenStorage {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_document(&self) -> Result<PersistedSession, StorageError> {
		let contents = match fs::read_to_string(&self.path) {
			Ok(contents) => contents,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PersistedSession::default()),
			Err(e) => return Err(e.into()),
		};
		if contents.trim().is_empty() {
			return Ok(PersistedSession::default());
		}
		Ok(serde_json::from_str(&contents)?)
	}

	fn write_document(&self, document: &PersistedSession) -> Result<(), StorageError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}

		let contents = serde_json::to_string_pretty(document)?;

		let temp_path = self.path.with_extension("tmp");
		let mut options = fs::OpenOptions::new();
		options.write(true).create(true).truncate(true);
		#[cfg(unix)]
		{
			use std::os::unix::fs::OpenOptionsExt;
			options.mode(0o600);
		}
		let mut file = options.open(&temp_path)?;
		file.write_all(contents.as_bytes())?;
		file.sync_all()?;
		drop(file);

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let perms = fs::Permissions::from_mode(0o600);
			if let Err(e) = fs::set_permissions(&temp_path, perms) {
				warn!(path = ?temp_path, error = %e, "Failed to set session file permissions to 0600");
			}
		}

		fs::rename(&temp_path, &self.path)?;
		debug!(path = ?self.path, "Session file written");
		Ok(())
	}
}

impl TokenStorage for FileTokenStorage {
	fn load(&self) -> Result<Option<Token>, StorageError> {
		Ok(self.read_document()?.token.and_then(Token::new))
	}

	fn save(&self, token: &Token) -> Result<(), StorageError> {
		self.write_document(&PersistedSession {
			token: Some(token.expose().to_string()),
		})
	}

	fn delete(&self) -> Result<(), StorageError> {
		match fs::remove_file(&self.path) {
			Ok(()) => {
				debug!(path = ?self.path, "Session file removed");
				Ok(())
			}
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
	token: RwLock<Option<Token>>,
}

impl MemoryTokenStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_token(token: Token) -> Self {
		Self {
			token: RwLock::new(Some(token)),
		}
	}
}

impl TokenStorage for MemoryTokenStorage {
	fn load(&self) -> Result<Option<Token>, StorageError> {
		Ok(self.token.read().unwrap_or_else(PoisonError::into_inner).clone())
	}

	fn save(&self, token: &Token) -> Result<(), StorageError> {
		*self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
		Ok(())
	}

	fn delete(&self) -> Result<(), StorageError> {
		*self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
		Ok(())
	}
}
