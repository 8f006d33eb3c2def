// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a new HTTP client with the standard Murmur User-Agent header and
/// the default timeout.
pub fn new_client() -> Client {
	new_client_with_timeout(DEFAULT_TIMEOUT)
}

/// Creates a new HTTP client builder with the standard Murmur User-Agent header.
///
/// Use this when you need to customize the client further.
pub(crate) fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client with a custom timeout and the standard User-Agent.
pub fn new_client_with_timeout(timeout: Duration) -> Client {
	builder()
		.timeout(timeout)
		.build()
		.expect("failed to build HTTP client")
}

/// Returns the standard Murmur User-Agent string.
///
/// Format: `murmur/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"murmur/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}
