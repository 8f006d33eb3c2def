// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, instrument};

use murmur_cli_config::MurmurConfig;
use murmur_feed::{ChannelConfig, ChannelState, FeedAggregator, FeedClient, ReconnectingChannel};
use murmur_session::{AccessGuard, GuardDecision, Route};

use crate::render::format_post;

/// Stops unauthenticated users at the door with a pointer to the command
/// that gets them in.
pub fn require_session(client: &FeedClient) -> Result<()> {
	let guard = AccessGuard::new(Arc::clone(client.session()), |route: Route| {
		let command = match route {
			Route::Register => "murmur register <username>",
			_ => "murmur login <username>",
		};
		eprintln!("Not signed in. Run `{command}` first.");
	});

	match guard.check(Route::Feed) {
		GuardDecision::Allow => Ok(()),
		GuardDecision::Redirect(route) => bail!("authentication required (redirected to {route})"),
	}
}

/// Prints the current feed, newest last, then tails new posts until Ctrl-C.
#[instrument(skip_all, fields(follow = follow, limit = ?limit))]
pub async fn show(
	client: Arc<FeedClient>,
	config: &MurmurConfig,
	follow: bool,
	limit: Option<usize>,
) -> Result<()> {
	require_session(&client)?;

	let feed = FeedAggregator::new(client);

	// Subscribe before the snapshot so nothing pushed meanwhile is lost.
	let channel = if follow {
		let channel_config = ChannelConfig {
			reconnect_delay: config.reconnect_delay,
			..Default::default()
		};
		Some(
			ReconnectingChannel::connect(config.ws_url.as_str(), channel_config)
				.context("failed to start push channel")?,
		)
	} else {
		None
	};
	let live = channel.as_ref().map(|c| c.inbound_events());

	feed.initialize().await.context("failed to load feed")?;

	let posts = feed.snapshot().await;
	let shown = limit.unwrap_or(posts.len()).min(posts.len());
	for post in posts[..shown].iter().rev() {
		println!("{}", format_post(post));
	}

	let (Some(channel), Some(live)) = (channel, live) else {
		return Ok(());
	};

	let mut seen = feed.len().await;
	let mut updates = feed.updates();
	updates.borrow_and_update();
	let mut states = channel.state_changes();
	let follower = feed.follow(live);

	eprintln!("Following {} (Ctrl-C to stop)", config.ws_url);

	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			changed = updates.changed() => {
				if changed.is_err() {
					break;
				}
				let posts = feed.snapshot().await;
				let fresh = posts.len().saturating_sub(seen);
				for post in posts[..fresh].iter().rev() {
					println!("{}", format_post(post));
				}
				seen = posts.len();
			}
			changed = states.changed() => {
				if changed.is_err() {
					break;
				}
				let state = *states.borrow_and_update();
				debug!(%state, "channel state changed");
				if state.is_terminal() {
					eprintln!(
						"Connection {state}; retrying in {}s",
						config.reconnect_delay.as_secs_f32()
					);
				} else if state == ChannelState::Open {
					eprintln!("Connected.");
				}
			}
		}
	}

	channel.close();
	follower.await.ok();
	Ok(())
}

/// Publishes `content` and prints the post the server created.
#[instrument(skip_all)]
pub async fn publish(client: Arc<FeedClient>, content: &str) -> Result<()> {
	require_session(&client)?;

	let feed = FeedAggregator::new(client);
	let post = feed.publish(content).await.context("failed to publish post")?;
	println!("{}", format_post(&post));
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	use murmur_session::{SessionStore, Token};

	fn client(session: Arc<SessionStore>) -> FeedClient {
		FeedClient::with_session("http://localhost:8080", session, Duration::from_secs(5)).unwrap()
	}

	#[test]
	fn signed_out_users_are_turned_away() {
		let client = client(Arc::new(SessionStore::in_memory()));
		let err = require_session(&client).unwrap_err();
		assert!(err.to_string().contains("authentication required"));
	}

	#[test]
	fn signed_in_users_pass() {
		let session = Arc::new(SessionStore::in_memory());
		session.set_token(Token::new("abc").unwrap());
		assert!(require_session(&client(session)).is_ok());
	}
}
