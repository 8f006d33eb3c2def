// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response bodies for the feed's REST endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Body of `POST /register` and `POST /login`.
#[derive(Clone, Serialize)]
pub struct Credentials {
	pub username: String,
	pub password: String,
}

impl Credentials {
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: password.into(),
		}
	}

	/// Both fields must be present; nothing else is checked client-side.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.username.trim().is_empty() {
			return Err(ValidationError::MissingUsername);
		}
		if self.password.is_empty() {
			return Err(ValidationError::MissingPassword);
		}
		Ok(())
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("password", &"[REDACTED]")
			.finish()
	}
}

/// Successful auth response. A missing or empty token is treated as a
/// failed login by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
	#[serde(default)]
	pub token: Option<String>,
}

/// Body of `POST /posts`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePostRequest<'a> {
	pub content: &'a str,
}

/// Error envelope the server uses for non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
}
