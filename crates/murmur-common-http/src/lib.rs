// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Murmur.
//!
//! Every REST call the client makes goes through a `reqwest::Client` built
//! here, so the User-Agent and timeout stay consistent.

mod client;

pub use client::{new_client, new_client_with_timeout, user_agent, DEFAULT_TIMEOUT};
