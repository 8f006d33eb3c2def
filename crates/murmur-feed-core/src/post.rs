// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The feed entry record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One entry in the feed.
///
/// Posts are created by the server and never modified afterwards. `id` is an
/// opaque server identifier; `created_at` travels as RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
	pub id: String,
	/// Author id. Older servers omit it.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub user_id: String,
	pub username: String,
	pub content: String,
	pub created_at: DateTime<Utc>,
}

impl Post {
	/// Checks the invariants a server-issued post must satisfy.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.id.trim().is_empty() {
			return Err(ValidationError::MissingId);
		}
		if self.content.trim().is_empty() {
			return Err(ValidationError::EmptyContent);
		}
		Ok(())
	}

	/// Decodes and validates one push-channel message.
	pub fn decode(message: &str) -> Result<Self, ValidationError> {
		let post: Post =
			serde_json::from_str(message).map_err(|e| ValidationError::Malformed(e.to_string()))?;
		post.validate()?;
		Ok(post)
	}
}

/// Normalises user-entered post content, rejecting blank input.
pub fn validate_content(content: &str) -> Result<&str, ValidationError> {
	let trimmed = content.trim();
	if trimmed.is_empty() {
		Err(ValidationError::EmptyContent)
	} else {
		Ok(trimmed)
	}
}
