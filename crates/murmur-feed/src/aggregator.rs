// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Newest-first view of the feed, fed by a snapshot and live pushes.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use murmur_feed_core::{validate_content, Post};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::channel::ReconnectingChannel;
use crate::client::FeedApi;
use crate::error::Result;

struct FeedState {
	posts: RwLock<Vec<Post>>,
	revision: watch::Sender<u64>,
}

impl FeedState {
	fn bump(&self) {
		self.revision.send_modify(|r| *r += 1);
	}
}

/// Holds the displayed post list.
///
/// Index 0 is always the newest post. [`initialize`](Self::initialize)
/// replaces the list with the server's snapshot; every pushed post goes to
/// the front. Posts are not deduplicated, so a post that arrives both in a
/// snapshot and as a push shows up twice.
#[derive(Clone)]
pub struct FeedAggregator {
	api: Arc<dyn FeedApi>,
	state: Arc<FeedState>,
}

impl FeedAggregator {
	pub fn new(api: Arc<dyn FeedApi>) -> Self {
		let (revision, _) = watch::channel(0);
		Self {
			api,
			state: Arc::new(FeedState {
				posts: RwLock::new(Vec::new()),
				revision,
			}),
		}
	}

	/// Loads the full list from the server and replaces the current one.
	///
	/// On failure the list is left as it was. Returns the number of posts
	/// loaded.
	#[instrument(skip(self))]
	pub async fn initialize(&self) -> Result<usize> {
		let posts = match self.api.list_posts().await {
			Ok(posts) => posts,
			Err(e) => {
				warn!(error = %e, "failed to load feed snapshot");
				return Err(e);
			}
		};

		let count = posts.len();
		*self.state.posts.write().await = posts;
		self.state.bump();
		info!(count, "feed snapshot loaded");
		Ok(count)
	}

	/// Puts `post` at the front of the list.
	pub async fn prepend(&self, post: Post) {
		debug!(id = %post.id, "prepending post");
		self.state.posts.write().await.insert(0, post);
		self.state.bump();
	}

	/// Submits a new post and returns it as the server stored it.
	///
	/// Blank content is rejected before any request. The list is not changed
	/// here. Callers [`prepend`](Self::prepend) the returned post so it shows
	/// at once, and when the channel echoes it back a second entry appears.
	pub async fn publish(&self, content: &str) -> Result<Post> {
		let content = validate_content(content)?;
		self.api.create_post(content).await
	}

	/// Prepends every post `channel` delivers until the channel closes.
	pub fn attach(&self, channel: &ReconnectingChannel) -> JoinHandle<()> {
		self.follow(channel.inbound_events())
	}

	/// Prepends every post from `posts` until the stream ends.
	pub fn follow<S>(&self, posts: S) -> JoinHandle<()>
	where
		S: Stream<Item = Post> + Send + 'static,
	{
		let aggregator = self.clone();
		tokio::spawn(async move {
			let mut posts = std::pin::pin!(posts);
			while let Some(post) = posts.next().await {
				aggregator.prepend(post).await;
			}
			debug!("feed event stream ended");
		})
	}

	/// A copy of the current list, newest first.
	pub async fn snapshot(&self) -> Vec<Post> {
		self.state.posts.read().await.clone()
	}

	pub async fn len(&self) -> usize {
		self.state.posts.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.state.posts.read().await.is_empty()
	}

	/// Ticks whenever the list changes.
	pub fn updates(&self) -> watch::Receiver<u64> {
		self.state.revision.subscribe()
	}
}
