// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::future::ready;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Sink, SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;
use url::Url;

use crate::error::ChannelError;

/// Text frames from the server. The stream ends when the server closes the
/// connection; an `Err` item means the connection failed.
pub type InboundFrames = BoxStream<'static, Result<String, ChannelError>>;

/// Text frames to the server.
pub type OutboundSink = Pin<Box<dyn Sink<String, Error = ChannelError> + Send>>;

/// One established connection, split into its two directions.
pub struct TransportConnection {
	pub inbound: InboundFrames,
	pub outbound: OutboundSink,
}

/// Opens connections for a [`ReconnectingChannel`](super::ReconnectingChannel).
///
/// Each call to `connect` is one attempt; retry policy lives in the channel.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	async fn connect(&self) -> Result<TransportConnection, ChannelError>;
}

/// WebSocket transport over `ws://` or `wss://`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
	url: Url,
}

impl WebSocketTransport {
	pub fn new(url: &str) -> Result<Self, ChannelError> {
		let url = Url::parse(url).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
		match url.scheme() {
			"ws" | "wss" => Ok(Self { url }),
			other => Err(ChannelError::InvalidUrl(format!(
				"unsupported scheme '{other}', expected ws or wss"
			))),
		}
	}

	pub fn url(&self) -> &Url {
		&self.url
	}
}

#[async_trait]
impl Transport for WebSocketTransport {
	async fn connect(&self) -> Result<TransportConnection, ChannelError> {
		debug!(url = %self.url, "opening websocket");
		let (ws_stream, _) = connect_async(self.url.as_str())
			.await
			.map_err(|e| ChannelError::Connect(e.to_string()))?;

		let (write, read) = ws_stream.split();

		// Only text frames carry posts. Control and binary frames are skipped.
		let inbound = read
			.take_while(|msg| ready(!matches!(msg, Ok(Message::Close(_)))))
			.filter_map(|msg| {
				ready(match msg {
					Ok(Message::Text(text)) => Some(Ok(text)),
					Ok(_) => None,
					Err(e) => Some(Err(ChannelError::Transport(e.to_string()))),
				})
			})
			.boxed();

		let outbound = write
			.sink_map_err(|e| ChannelError::Transport(e.to_string()))
			.with(|text: String| ready(Ok::<_, ChannelError>(Message::Text(text))));

		Ok(TransportConnection {
			inbound,
			outbound: Box::pin(outbound),
		})
	}
}
