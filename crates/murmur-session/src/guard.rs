// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Navigation guard for views that need a signed-in user.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::store::SessionStore;

/// Views a client can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
	Login,
	Register,
	Feed,
}

impl Route {
	/// Maps a path to a route. Unknown paths land on the feed.
	pub fn parse(path: &str) -> Self {
		match path.trim().trim_matches('/') {
			"login" => Route::Login,
			"register" => Route::Register,
			_ => Route::Feed,
		}
	}

	pub fn path(self) -> &'static str {
		match self {
			Route::Login => "/login",
			Route::Register => "/register",
			Route::Feed => "/",
		}
	}

	pub fn is_protected(self) -> bool {
		matches!(self, Route::Feed)
	}
}

impl fmt::Display for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.path())
	}
}

/// Receives redirects issued by the guard.
pub trait Navigator: Send + Sync {
	fn navigate(&self, route: Route);
}

impl<F> Navigator for F
where
	F: Fn(Route) + Send + Sync,
{
	fn navigate(&self, route: Route) {
		self(route)
	}
}

/// Outcome of one navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
	Allow,
	Redirect(Route),
}

impl GuardDecision {
	pub fn is_allowed(self) -> bool {
		matches!(self, GuardDecision::Allow)
	}
}

/// Permits entry to protected views only while the session is authenticated.
///
/// Each call samples the session signal once; a sign-out that lands after the
/// decision does not revoke it.
pub struct AccessGuard<N> {
	session: Arc<SessionStore>,
	navigator: N,
}

impl<N: Navigator> AccessGuard<N> {
	pub fn new(session: Arc<SessionStore>, navigator: N) -> Self {
		Self { session, navigator }
	}

	/// Decides whether a protected view may activate. On denial the navigator
	/// is sent to the login route.
	pub fn can_activate(&self) -> GuardDecision {
		let authenticated = *self.session.authenticated_state().borrow();
		if authenticated {
			GuardDecision::Allow
		} else {
			debug!(redirect = %Route::Login, "session not authenticated; redirecting");
			self.navigator.navigate(Route::Login);
			GuardDecision::Redirect(Route::Login)
		}
	}

	/// Checks navigation to `route`. Unprotected routes always pass.
	pub fn check(&self, route: Route) -> GuardDecision {
		if route.is_protected() {
			self.can_activate()
		} else {
			GuardDecision::Allow
		}
	}

	/// Parses `path` and checks navigation to it.
	pub fn resolve(&self, path: &str) -> (Route, GuardDecision) {
		let route = Route::parse(path);
		(route, self.check(route))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::Token;
	use proptest::prelude::*;
	use std::sync::Mutex;

	#[derive(Clone, Default)]
	struct RecordingNavigator {
		visited: Arc<Mutex<Vec<Route>>>,
	}

	impl Navigator for RecordingNavigator {
		fn navigate(&self, route: Route) {
			self.visited.lock().unwrap().push(route);
		}
	}

	fn guard() -> (Arc<SessionStore>, RecordingNavigator, AccessGuard<RecordingNavigator>) {
		let session = Arc::new(SessionStore::in_memory());
		let navigator = RecordingNavigator::default();
		let guard = AccessGuard::new(Arc::clone(&session), navigator.clone());
		(session, navigator, guard)
	}

	#[test]
	fn denies_and_redirects_when_signed_out() {
		let (_session, navigator, guard) = guard();
		assert_eq!(guard.can_activate(), GuardDecision::Redirect(Route::Login));
		assert_eq!(*navigator.visited.lock().unwrap(), vec![Route::Login]);
	}

	#[test]
	fn allows_when_signed_in() {
		let (session, navigator, guard) = guard();
		session.set_token(Token::new("abc").unwrap());
		assert_eq!(guard.can_activate(), GuardDecision::Allow);
		assert!(navigator.visited.lock().unwrap().is_empty());
	}

	#[test]
	fn follows_sign_out() {
		let (session, navigator, guard) = guard();
		session.set_token(Token::new("abc").unwrap());
		assert!(guard.can_activate().is_allowed());

		session.clear_token();
		assert!(!guard.can_activate().is_allowed());
		assert_eq!(navigator.visited.lock().unwrap().len(), 1);
	}

	#[test]
	fn public_routes_never_redirect() {
		let (_session, navigator, guard) = guard();
		assert_eq!(guard.check(Route::Login), GuardDecision::Allow);
		assert_eq!(guard.check(Route::Register), GuardDecision::Allow);
		assert!(navigator.visited.lock().unwrap().is_empty());
	}

	#[test]
	fn resolve_sends_unknown_paths_through_feed_guard() {
		let (_session, _navigator, guard) = guard();
		assert_eq!(
			guard.resolve("/does/not/exist"),
			(Route::Feed, GuardDecision::Redirect(Route::Login))
		);
		assert_eq!(guard.resolve("/login"), (Route::Login, GuardDecision::Allow));
	}

	#[test]
	fn closures_work_as_navigators() {
		let session = Arc::new(SessionStore::in_memory());
		let hits = Arc::new(Mutex::new(0));
		let counter = Arc::clone(&hits);
		let guard = AccessGuard::new(session, move |_route: Route| {
			*counter.lock().unwrap() += 1;
		});
		guard.can_activate();
		guard.can_activate();
		assert_eq!(*hits.lock().unwrap(), 2);
	}

	#[test]
	fn route_parse_known_paths() {
		assert_eq!(Route::parse("/login"), Route::Login);
		assert_eq!(Route::parse("login/"), Route::Login);
		assert_eq!(Route::parse("/register"), Route::Register);
		assert_eq!(Route::parse("/"), Route::Feed);
		assert_eq!(Route::parse(""), Route::Feed);
	}

	proptest! {
		/// Redirect happens exactly when the signal is false.
		#[test]
		fn redirect_iff_unauthenticated(signed_in in any::<bool>()) {
			let (session, navigator, guard) = guard();
			if signed_in {
				session.set_token(Token::new("abc").unwrap());
			}
			let decision = guard.can_activate();
			prop_assert_eq!(decision.is_allowed(), signed_in);
			prop_assert_eq!(navigator.visited.lock().unwrap().is_empty(), signed_in);
		}

		#[test]
		fn route_path_roundtrips(route in prop_oneof![Just(Route::Login), Just(Route::Register), Just(Route::Feed)]) {
			prop_assert_eq!(Route::parse(route.path()), route);
		}
	}
}
