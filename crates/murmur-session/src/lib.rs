// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session state for the Murmur client.
//!
//! This crate provides:
//! - [`Token`]: the opaque bearer credential, redacted in all output
//! - [`TokenStorage`] backends: a JSON file and an in-memory store
//! - [`SessionStore`]: the owned session object with a live
//!   "is authenticated" signal
//! - [`AccessGuard`]: the navigation predicate for protected views
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use murmur_session::{AccessGuard, FileTokenStorage, Route, SessionStore, Token};
//!
//! let session = Arc::new(SessionStore::new(FileTokenStorage::new(
//!     "/tmp/murmur/session.json",
//! )));
//! session.set_token(Token::new("issued-by-server").unwrap());
//!
//! let guard = AccessGuard::new(Arc::clone(&session), |route: Route| {
//!     eprintln!("redirecting to {route}");
//! });
//! assert!(guard.check(Route::Feed).is_allowed());
//! ```

mod error;
mod guard;
mod storage;
mod store;
mod token;

pub use error::StorageError;
pub use guard::{AccessGuard, GuardDecision, Navigator, Route};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::SessionStore;
pub use token::{Token, REDACTED};
