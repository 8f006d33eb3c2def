// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};
use tracing::{info, instrument, warn};

use murmur_feed::{FeedClient, FeedError};
use murmur_feed_core::Credentials;

/// Uses `password` if given, otherwise prompts on stderr and reads a line
/// from stdin.
pub fn resolve_password(password: Option<String>) -> Result<String> {
	if let Some(password) = password {
		return Ok(password);
	}

	eprint!("Password: ");
	io::stderr().flush().ok();

	let mut line = String::new();
	io::stdin()
		.lock()
		.read_line(&mut line)
		.context("failed to read password")?;
	Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[instrument(skip_all, fields(username = %username))]
pub async fn login(client: &FeedClient, username: &str, password: &str) -> Result<()> {
	let credentials = Credentials::new(username, password);
	client
		.login(&credentials)
		.await
		.map_err(|e| user_facing(e, "Invalid credentials"))?;

	info!("login complete");
	eprintln!("Signed in as {username}.");
	Ok(())
}

#[instrument(skip_all, fields(username = %username))]
pub async fn register(client: &FeedClient, username: &str, password: &str) -> Result<()> {
	let credentials = Credentials::new(username, password);
	client
		.register(&credentials)
		.await
		.map_err(|e| user_facing(e, "Registration failed"))?;

	info!("registration complete");
	eprintln!("Registered and signed in as {username}.");
	Ok(())
}

pub fn logout(client: &FeedClient) {
	client.logout();
	eprintln!("Signed out.");
}

pub fn status(client: &FeedClient) {
	if client.session().is_authenticated() {
		println!("Signed in to {}", client.base_url());
	} else {
		println!("Not signed in to {}", client.base_url());
	}
}

/// Rejections collapse to `generic`; the server's reason is only logged.
fn user_facing(err: FeedError, generic: &'static str) -> anyhow::Error {
	match err {
		FeedError::Authentication(reason) => {
			warn!(%reason, "authentication rejected");
			anyhow!(generic)
		}
		FeedError::Validation(e) => anyhow!(e),
		other => anyhow!(other).context("could not reach the server"),
	}
}
