// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Push channel that reconnects on its own.
//!
//! A [`ReconnectingChannel`] owns one background task. The task opens a
//! connection through a [`Transport`], decodes every text frame as a
//! [`Post`] and fans the posts out to subscribers. When the connection ends,
//! whether the server closed it or it failed, the task waits for the
//! configured delay and tries again. It stops only when [`close`] is called
//! or the channel is dropped.
//!
//! Subscriber streams live across reconnects: a stream obtained once keeps
//! yielding posts from every later connection.
//!
//! [`close`]: ReconnectingChannel::close

mod timer;
mod transport;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{SinkExt, StreamExt};
use murmur_feed_core::Post;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::ChannelError;

pub use timer::{ReconnectTimer, TokioTimer};
pub use transport::{InboundFrames, OutboundSink, Transport, TransportConnection, WebSocketTransport};

/// Posts pushed by the server, in arrival order.
pub type PostStream = BoxStream<'static, Post>;

/// Delay between a dropped connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Posts buffered per subscriber before the slowest one starts losing them.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
	/// Not started, or closed by the owner.
	Disconnected,
	Connecting,
	Open,
	/// The server ended the connection.
	Closed,
	/// The connection failed or could not be opened.
	Errored,
}

impl ChannelState {
	/// True for the two states that schedule a reconnect.
	pub fn is_terminal(self) -> bool {
		matches!(self, ChannelState::Closed | ChannelState::Errored)
	}
}

impl fmt::Display for ChannelState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ChannelState::Disconnected => "disconnected",
			ChannelState::Connecting => "connecting",
			ChannelState::Open => "open",
			ChannelState::Closed => "closed",
			ChannelState::Errored => "errored",
		};
		f.write_str(s)
	}
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
	pub reconnect_delay: Duration,
	pub event_buffer: usize,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		Self {
			reconnect_delay: DEFAULT_RECONNECT_DELAY,
			event_buffer: DEFAULT_EVENT_BUFFER,
		}
	}
}

struct Shared {
	// Dropping the sender ends every subscriber stream.
	events: Mutex<Option<broadcast::Sender<Post>>>,
	outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
	state: watch::Sender<ChannelState>,
	cancel: CancellationToken,
	reconnect_attempts: AtomicU64,
	events_received: AtomicU64,
	decode_failures: AtomicU64,
}

impl Shared {
	/// Moves to `next` unless the channel has been closed.
	///
	/// Holding the events lock orders this against `close`, so no transition
	/// lands after the final `Disconnected`.
	fn transition(&self, next: ChannelState) -> bool {
		let _events = lock(&self.events);
		if self.cancel.is_cancelled() {
			return false;
		}
		let previous = self.state.send_replace(next);
		trace!(from = %previous, to = %next, "channel state");
		true
	}

	fn receive(&self, text: &str) {
		match Post::decode(text) {
			Ok(post) => {
				self.events_received.fetch_add(1, Ordering::Relaxed);
				self.publish(post);
			}
			Err(e) => {
				self.decode_failures.fetch_add(1, Ordering::Relaxed);
				warn!(error = %e, "dropping undecodable channel message");
			}
		}
	}

	fn publish(&self, post: Post) {
		let events = lock(&self.events);
		if self.cancel.is_cancelled() {
			return;
		}
		if let Some(tx) = events.as_ref() {
			if tx.send(post).is_err() {
				trace!("no subscribers for channel event");
			}
		}
	}
}

/// A push channel that keeps itself connected until closed.
pub struct ReconnectingChannel {
	shared: Arc<Shared>,
	task: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectingChannel {
	/// Spawns the connection task on the current tokio runtime.
	pub fn start<T, R>(transport: T, timer: R, config: ChannelConfig) -> Self
	where
		T: Transport,
		R: ReconnectTimer,
	{
		let (events, _) = broadcast::channel(config.event_buffer.max(1));
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (state, _) = watch::channel(ChannelState::Disconnected);

		let shared = Arc::new(Shared {
			events: Mutex::new(Some(events)),
			outbound: Mutex::new(Some(outbound_tx)),
			state,
			cancel: CancellationToken::new(),
			reconnect_attempts: AtomicU64::new(0),
			events_received: AtomicU64::new(0),
			decode_failures: AtomicU64::new(0),
		});

		let task = tokio::spawn(run(shared.clone(), transport, timer, config, outbound_rx));

		Self {
			shared,
			task: Mutex::new(Some(task)),
		}
	}

	/// Connects to a WebSocket endpoint with the wall-clock timer.
	pub fn connect(url: &str, config: ChannelConfig) -> Result<Self, ChannelError> {
		let transport = WebSocketTransport::new(url)?;
		info!(url = %transport.url(), "starting feed channel");
		Ok(Self::start(transport, TokioTimer, config))
	}

	/// A stream of every post received from now on.
	///
	/// The stream survives reconnects and ends when the channel is closed. A
	/// subscriber that falls more than the event buffer behind skips the
	/// posts it missed.
	pub fn inbound_events(&self) -> PostStream {
		let rx = match lock(&self.shared.events).as_ref() {
			Some(tx) => tx.subscribe(),
			None => return stream::empty().boxed(),
		};

		stream::unfold(rx, |mut rx| async move {
			loop {
				match rx.recv().await {
					Ok(post) => return Some((post, rx)),
					Err(RecvError::Lagged(skipped)) => {
						warn!(skipped, "feed subscriber lagged; skipping posts");
					}
					Err(RecvError::Closed) => return None,
				}
			}
		})
		.boxed()
	}

	/// Queues `text` on the open connection.
	///
	/// Returns false, and drops the message, when the channel is not open.
	pub fn send(&self, text: impl Into<String>) -> bool {
		if *self.shared.state.borrow() != ChannelState::Open {
			debug!("channel not open; dropping outbound message");
			return false;
		}
		match lock(&self.shared.outbound).as_ref() {
			Some(tx) => tx.send(text.into()).is_ok(),
			None => false,
		}
	}

	/// Stops the channel for good.
	///
	/// Cancels any pending reconnect, drops the live connection and ends
	/// every subscriber stream. Calling it again does nothing.
	pub fn close(&self) {
		{
			let mut events = lock(&self.shared.events);
			if self.shared.cancel.is_cancelled() {
				return;
			}
			self.shared.cancel.cancel();
			events.take();
		}
		lock(&self.shared.outbound).take();
		if let Some(task) = lock(&self.task).take() {
			task.abort();
		}
		self.shared.state.send_replace(ChannelState::Disconnected);
		info!("feed channel closed");
	}

	pub fn state(&self) -> ChannelState {
		*self.shared.state.borrow()
	}

	/// Watches state transitions. Only the latest state is kept.
	pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
		self.shared.state.subscribe()
	}

	pub fn is_closed(&self) -> bool {
		self.shared.cancel.is_cancelled()
	}

	/// Reconnects scheduled so far.
	pub fn reconnect_attempts(&self) -> u64 {
		self.shared.reconnect_attempts.load(Ordering::Relaxed)
	}

	/// Posts decoded and delivered so far.
	pub fn events_received(&self) -> u64 {
		self.shared.events_received.load(Ordering::Relaxed)
	}

	/// Messages dropped because they did not decode as a valid post.
	pub fn decode_failures(&self) -> u64 {
		self.shared.decode_failures.load(Ordering::Relaxed)
	}
}

impl fmt::Debug for ReconnectingChannel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReconnectingChannel")
			.field("state", &self.state())
			.field("reconnect_attempts", &self.reconnect_attempts())
			.finish()
	}
}

impl Drop for ReconnectingChannel {
	fn drop(&mut self) {
		self.close();
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run<T, R>(
	shared: Arc<Shared>,
	transport: T,
	timer: R,
	config: ChannelConfig,
	mut outbound: mpsc::UnboundedReceiver<String>,
) where
	T: Transport,
	R: ReconnectTimer,
{
	loop {
		if !shared.transition(ChannelState::Connecting) {
			break;
		}

		let attempt = tokio::select! {
			biased;
			_ = shared.cancel.cancelled() => break,
			result = transport.connect() => result,
		};

		let terminal = match attempt {
			Ok(connection) => match run_connection(&shared, connection, &mut outbound).await {
				Some(state) => state,
				None => break,
			},
			Err(e) => {
				warn!(error = %e, "feed channel connect failed");
				ChannelState::Errored
			}
		};

		if !shared.transition(terminal) {
			break;
		}

		let attempts = shared.reconnect_attempts.fetch_add(1, Ordering::Relaxed) + 1;
		info!(
			state = %terminal,
			attempts,
			delay_ms = config.reconnect_delay.as_millis() as u64,
			"feed channel dropped; reconnecting"
		);

		tokio::select! {
			biased;
			_ = shared.cancel.cancelled() => break,
			_ = timer.sleep(config.reconnect_delay) => {}
		}
	}
	debug!("feed channel task stopped");
}

/// Pumps one connection until it ends. Returns the state to report, or
/// `None` if the channel was closed meanwhile.
async fn run_connection(
	shared: &Shared,
	connection: TransportConnection,
	outbound: &mut mpsc::UnboundedReceiver<String>,
) -> Option<ChannelState> {
	let TransportConnection {
		mut inbound,
		outbound: mut sink,
	} = connection;

	// Messages queued for an earlier connection are stale.
	while outbound.try_recv().is_ok() {}

	if !shared.transition(ChannelState::Open) {
		return None;
	}
	info!("feed channel open");

	loop {
		tokio::select! {
			biased;
			_ = shared.cancel.cancelled() => return None,
			frame = inbound.next() => match frame {
				Some(Ok(text)) => shared.receive(&text),
				Some(Err(e)) => {
					warn!(error = %e, "feed channel failed");
					return Some(ChannelState::Errored);
				}
				None => {
					info!("feed channel closed by server");
					return Some(ChannelState::Closed);
				}
			},
			Some(text) = outbound.recv() => {
				if let Err(e) = sink.send(text).await {
					warn!(error = %e, "feed channel send failed");
					return Some(ChannelState::Errored);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::future::Future;
	use std::sync::atomic::AtomicUsize;

	use async_trait::async_trait;
	use futures::channel::mpsc as fmpsc;
	use tokio::sync::Semaphore;

	async fn within<F: Future>(fut: F) -> F::Output {
		tokio::time::timeout(Duration::from_secs(5), fut)
			.await
			.expect("timed out")
	}

	async fn wait_for_state(states: &mut watch::Receiver<ChannelState>, target: ChannelState) {
		within(states.wait_for(|s| *s == target))
			.await
			.map(|_| ())
			.expect("state channel closed");
	}

	fn post_frame(id: &str, content: &str) -> String {
		serde_json::json!({
			"id": id,
			"user_id": "u1",
			"username": "alice",
			"content": content,
			"created_at": "2024-01-01T00:00:00Z",
		})
		.to_string()
	}

	/// Server half of a fake connection.
	struct FakeServer {
		frames: Option<fmpsc::UnboundedSender<Result<String, ChannelError>>>,
		sent: fmpsc::UnboundedReceiver<String>,
	}

	impl FakeServer {
		fn push(&self, frame: impl Into<String>) {
			if let Some(frames) = &self.frames {
				let _ = frames.unbounded_send(Ok(frame.into()));
			}
		}

		fn fail(&self, message: &str) {
			if let Some(frames) = &self.frames {
				let _ = frames.unbounded_send(Err(ChannelError::Transport(message.to_string())));
			}
		}

		fn hang_up(&mut self) {
			self.frames.take();
		}
	}

	type Outcome = Result<TransportConnection, ChannelError>;

	/// Hands out whatever the test scripts, one outcome per attempt. With
	/// nothing scripted, `connect` waits.
	#[derive(Clone)]
	struct ScriptedTransport {
		outcomes: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Outcome>>>,
		attempts: Arc<AtomicUsize>,
	}

	struct Script {
		outcomes: mpsc::UnboundedSender<Outcome>,
	}

	impl Script {
		fn accept(&self) -> FakeServer {
			let (frames_tx, frames_rx) = fmpsc::unbounded();
			let (sent_tx, sent_rx) = fmpsc::unbounded();
			let connection = TransportConnection {
				inbound: frames_rx.boxed(),
				outbound: Box::pin(
					sent_tx.sink_map_err(|e| ChannelError::Transport(e.to_string())),
				),
			};
			assert!(self.outcomes.send(Ok(connection)).is_ok());
			FakeServer {
				frames: Some(frames_tx),
				sent: sent_rx,
			}
		}

		fn refuse(&self, message: &str) {
			let refused = Err(ChannelError::Connect(message.to_string()));
			assert!(self.outcomes.send(refused).is_ok());
		}
	}

	fn scripted() -> (ScriptedTransport, Script) {
		let (tx, rx) = mpsc::unbounded_channel();
		let transport = ScriptedTransport {
			outcomes: Arc::new(tokio::sync::Mutex::new(rx)),
			attempts: Arc::new(AtomicUsize::new(0)),
		};
		(transport, Script { outcomes: tx })
	}

	#[async_trait]
	impl Transport for ScriptedTransport {
		async fn connect(&self) -> Result<TransportConnection, ChannelError> {
			self.attempts.fetch_add(1, Ordering::SeqCst);
			let next = self.outcomes.lock().await.recv().await;
			match next {
				Some(outcome) => outcome,
				None => std::future::pending().await,
			}
		}
	}

	/// Records each requested delay and holds it until the test fires.
	#[derive(Clone)]
	struct ManualTimer {
		started: mpsc::UnboundedSender<Duration>,
		gate: Arc<Semaphore>,
	}

	impl ManualTimer {
		fn new() -> (Self, mpsc::UnboundedReceiver<Duration>) {
			let (started, rx) = mpsc::unbounded_channel();
			(
				Self {
					started,
					gate: Arc::new(Semaphore::new(0)),
				},
				rx,
			)
		}

		fn fire(&self) {
			self.gate.add_permits(1);
		}
	}

	#[async_trait]
	impl ReconnectTimer for ManualTimer {
		async fn sleep(&self, delay: Duration) {
			let _ = self.started.send(delay);
			if let Ok(permit) = self.gate.acquire().await {
				permit.forget();
			}
		}
	}

	struct Harness {
		channel: ReconnectingChannel,
		script: Script,
		transport: ScriptedTransport,
		timer: ManualTimer,
		sleeps: mpsc::UnboundedReceiver<Duration>,
		states: watch::Receiver<ChannelState>,
	}

	fn harness() -> Harness {
		let (transport, script) = scripted();
		let (timer, sleeps) = ManualTimer::new();
		let channel =
			ReconnectingChannel::start(transport.clone(), timer.clone(), ChannelConfig::default());
		let states = channel.state_changes();
		Harness {
			channel,
			script,
			transport,
			timer,
			sleeps,
			states,
		}
	}

	#[test]
	fn terminal_states_are_closed_and_errored() {
		assert!(ChannelState::Closed.is_terminal());
		assert!(ChannelState::Errored.is_terminal());
		assert!(!ChannelState::Open.is_terminal());
		assert!(!ChannelState::Connecting.is_terminal());
		assert!(!ChannelState::Disconnected.is_terminal());
	}

	#[test]
	fn default_config_waits_three_seconds() {
		let config = ChannelConfig::default();
		assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
		assert_eq!(config.event_buffer, 256);
	}

	#[tokio::test]
	async fn reconnects_after_close_and_after_error() {
		let mut h = harness();

		wait_for_state(&mut h.states, ChannelState::Connecting).await;
		let mut server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;

		server.hang_up();
		wait_for_state(&mut h.states, ChannelState::Closed).await;
		assert_eq!(within(h.sleeps.recv()).await, Some(Duration::from_millis(3000)));
		assert_eq!(h.channel.reconnect_attempts(), 1);

		h.timer.fire();
		wait_for_state(&mut h.states, ChannelState::Connecting).await;
		let server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;

		server.fail("connection reset");
		wait_for_state(&mut h.states, ChannelState::Errored).await;
		assert_eq!(within(h.sleeps.recv()).await, Some(Duration::from_millis(3000)));
		assert_eq!(h.channel.reconnect_attempts(), 2);

		h.timer.fire();
		wait_for_state(&mut h.states, ChannelState::Connecting).await;
		assert_eq!(h.transport.attempts.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn failed_connect_is_errored_and_retried() {
		let mut h = harness();

		wait_for_state(&mut h.states, ChannelState::Connecting).await;
		h.script.refuse("connection refused");
		wait_for_state(&mut h.states, ChannelState::Errored).await;
		assert_eq!(within(h.sleeps.recv()).await, Some(Duration::from_millis(3000)));

		h.timer.fire();
		wait_for_state(&mut h.states, ChannelState::Connecting).await;
		let _server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;
		assert_eq!(h.channel.reconnect_attempts(), 1);
	}

	#[tokio::test]
	async fn subscribers_keep_receiving_across_reconnects() {
		let mut h = harness();
		let mut events = h.channel.inbound_events();

		let mut server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;
		server.push(post_frame("1", "first"));
		assert_eq!(within(events.next()).await.unwrap().id, "1");

		server.hang_up();
		wait_for_state(&mut h.states, ChannelState::Closed).await;
		h.timer.fire();

		let server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;
		server.push(post_frame("2", "second"));
		assert_eq!(within(events.next()).await.unwrap().id, "2");
		assert_eq!(h.channel.events_received(), 2);
	}

	#[tokio::test]
	async fn every_subscriber_sees_every_post() {
		let mut h = harness();
		let mut a = h.channel.inbound_events();
		let mut b = h.channel.inbound_events();

		let server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;
		server.push(post_frame("1", "hi"));

		assert_eq!(within(a.next()).await.unwrap().id, "1");
		assert_eq!(within(b.next()).await.unwrap().id, "1");
	}

	#[tokio::test]
	async fn undecodable_messages_are_dropped_and_counted() {
		let mut h = harness();
		let mut events = h.channel.inbound_events();

		let server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;
		server.push("not json");
		server.push(post_frame("", "missing id"));
		server.push(post_frame("3", "ok"));

		let post = within(events.next()).await.unwrap();
		assert_eq!(post.id, "3");
		assert_eq!(h.channel.decode_failures(), 2);
		assert_eq!(h.channel.events_received(), 1);
		assert_eq!(h.channel.state(), ChannelState::Open);
	}

	#[tokio::test]
	async fn send_only_succeeds_while_open() {
		let mut h = harness();

		wait_for_state(&mut h.states, ChannelState::Connecting).await;
		assert!(!h.channel.send("too early"));

		let mut server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;
		assert!(h.channel.send("hello"));
		assert_eq!(within(server.sent.next()).await.as_deref(), Some("hello"));

		server.hang_up();
		wait_for_state(&mut h.states, ChannelState::Closed).await;
		assert!(!h.channel.send("too late"));
	}

	#[tokio::test]
	async fn close_cancels_pending_reconnect() {
		let mut h = harness();
		let mut events = h.channel.inbound_events();

		let mut server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;
		server.hang_up();
		within(h.sleeps.recv()).await;

		h.channel.close();
		h.timer.fire();
		tokio::time::sleep(Duration::from_millis(50)).await;

		assert_eq!(h.channel.state(), ChannelState::Disconnected);
		assert_eq!(h.transport.attempts.load(Ordering::SeqCst), 1);
		assert!(within(events.next()).await.is_none());
		assert!(!h.channel.send("anything"));
		assert!(h.channel.is_closed());
	}

	#[tokio::test]
	async fn close_while_open_ends_streams() {
		let mut h = harness();
		let mut events = h.channel.inbound_events();

		let server = h.script.accept();
		wait_for_state(&mut h.states, ChannelState::Open).await;

		h.channel.close();
		assert!(within(events.next()).await.is_none());
		assert_eq!(h.channel.state(), ChannelState::Disconnected);

		// Frames after close go nowhere.
		server.push(post_frame("late", "ignored"));
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(h.channel.events_received(), 0);
		assert!(h.channel.inbound_events().next().await.is_none());
	}

	#[tokio::test]
	async fn close_is_idempotent() {
		let h = harness();
		h.channel.close();
		h.channel.close();
		assert_eq!(h.channel.state(), ChannelState::Disconnected);
	}
}
