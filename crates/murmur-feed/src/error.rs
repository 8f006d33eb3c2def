// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the Murmur feed SDK.

use murmur_feed_core::ValidationError;
use thiserror::Error;

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Failures surfaced to the caller of a REST operation.
///
/// Each is reported once; nothing at this layer retries.
#[derive(Debug, Error)]
pub enum FeedError {
	/// Login or registration was rejected. The session is unchanged.
	#[error("authentication failed: {0}")]
	Authentication(String),

	/// The request never completed (network down, server unreachable).
	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	/// An authorized call came back with a non-success status.
	#[error("server error ({status}): {message}")]
	Server { status: u16, message: String },

	/// The response body did not match the expected shape.
	#[error("invalid response: {0}")]
	InvalidResponse(String),

	/// Input rejected before any request was made.
	#[error("validation failed: {0}")]
	Validation(#[from] ValidationError),

	#[error("invalid server URL: {0}")]
	InvalidUrl(#[from] url::ParseError),
}

/// Failures inside the push channel.
///
/// These never reach feed consumers; the channel logs them and schedules a
/// reconnect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
	#[error("connect failed: {0}")]
	Connect(String),

	#[error("transport error: {0}")]
	Transport(String),

	#[error("invalid channel URL: {0}")]
	InvalidUrl(String),
}
