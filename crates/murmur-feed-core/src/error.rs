// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Input or payload rejected before it reaches, or after it leaves, the wire.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("post content cannot be empty")]
	EmptyContent,

	#[error("post is missing its id")]
	MissingId,

	#[error("username is required")]
	MissingUsername,

	#[error("password is required")]
	MissingPassword,

	#[error("malformed post: {0}")]
	Malformed(String),
}
