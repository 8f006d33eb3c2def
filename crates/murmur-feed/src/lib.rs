// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Realtime feed SDK for Murmur.
//!
//! - [`AuthorizingPipeline`]: attaches the session token to outbound requests
//! - [`FeedClient`]: register, login and the post endpoints
//! - [`ReconnectingChannel`]: the self-healing push connection
//! - [`FeedAggregator`]: snapshot plus live pushes, newest first
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use murmur_feed::{ChannelConfig, FeedAggregator, FeedClient, ReconnectingChannel};
//! use murmur_feed_core::Credentials;
//! use murmur_session::SessionStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(SessionStore::in_memory());
//! let client = Arc::new(FeedClient::with_session(
//!     "http://localhost:8080",
//!     session,
//!     Duration::from_secs(30),
//! )?);
//! client.login(&Credentials::new("alice", "secret")).await?;
//!
//! let feed = FeedAggregator::new(client);
//! feed.initialize().await?;
//!
//! let channel = ReconnectingChannel::connect("ws://localhost:8080/ws", ChannelConfig::default())?;
//! let _live = feed.attach(&channel);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod channel;
pub mod client;
pub mod error;
pub mod pipeline;

pub use aggregator::FeedAggregator;
pub use channel::{
	ChannelConfig, ChannelState, PostStream, ReconnectTimer, ReconnectingChannel, TokioTimer,
	Transport, TransportConnection, WebSocketTransport,
};
pub use client::{FeedApi, FeedClient};
pub use error::{ChannelError, FeedError, Result};
pub use pipeline::AuthorizingPipeline;
