// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The process-wide session.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::storage::{MemoryTokenStorage, TokenStorage};
use crate::token::Token;

/// Owns the session token and the live "is authenticated" signal.
///
/// Storage is the source of truth for [`current_token`](Self::current_token);
/// nothing is cached in-process so that several processes sharing one
/// session file agree on the token. The signal is per-process and follows
/// every successful write.
///
/// Storage failures are logged and the write becomes a no-op: the signal only
/// moves when the storage accepted the change.
#[derive(Debug)]
pub struct SessionStore {
	storage: Box<dyn TokenStorage>,
	authenticated: watch::Sender<bool>,
}

impl SessionStore {
	/// Opens a session backed by `storage`, seeding the signal from whatever
	/// token is already persisted.
	pub fn new(storage: impl TokenStorage + 'static) -> Self {
		let initial = match storage.load() {
			Ok(token) => token.is_some(),
			Err(e) => {
				warn!(error = %e, "failed to read persisted session; starting unauthenticated");
				false
			}
		};
		debug!(authenticated = initial, "session opened");
		let (authenticated, _) = watch::channel(initial);
		Self {
			storage: Box::new(storage),
			authenticated,
		}
	}

	/// A session that lives only as long as the process.
	pub fn in_memory() -> Self {
		Self::new(MemoryTokenStorage::new())
	}

	/// Persists `token` and flips the signal to `true`.
	pub fn set_token(&self, token: Token) {
		match self.storage.save(&token) {
			Ok(()) => {
				self.authenticated.send_replace(true);
				info!("session token stored");
			}
			Err(e) => warn!(error = %e, "failed to persist session token"),
		}
	}

	/// Removes the persisted token and flips the signal to `false`.
	pub fn clear_token(&self) {
		match self.storage.delete() {
			Ok(()) => {
				self.authenticated.send_replace(false);
				info!("session token cleared");
			}
			Err(e) => warn!(error = %e, "failed to remove session token"),
		}
	}

	/// Reads the token straight from storage.
	pub fn current_token(&self) -> Option<Token> {
		match self.storage.load() {
			Ok(token) => token,
			Err(e) => {
				warn!(error = %e, "failed to read session token");
				None
			}
		}
	}

	/// Subscribes to the authenticated signal.
	///
	/// The receiver holds the current value immediately (`*rx.borrow()`) and
	/// is notified on every later `set_token`/`clear_token`.
	pub fn authenticated_state(&self) -> watch::Receiver<bool> {
		self.authenticated.subscribe()
	}

	pub fn is_authenticated(&self) -> bool {
		*self.authenticated.borrow()
	}
}
