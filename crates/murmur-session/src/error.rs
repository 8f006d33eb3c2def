// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token storage error types.

/// Errors raised by a [`TokenStorage`](crate::TokenStorage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("IO error: {0}")]
	Io(String),

	#[error("Serialization error: {0}")]
	Serde(String),

	#[error("Storage unavailable: {0}")]
	Unavailable(String),
}

impl From<std::io::Error> for StorageError {
	fn from(err: std::io::Error) -> Self {
		StorageError::Io(err.to_string())
	}
}

impl From<serde_json::Error> for StorageError {
	fn from(err: serde_json::Error) -> Self {
		StorageError::Serde(err.to_string())
	}
}
