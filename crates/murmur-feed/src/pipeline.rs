// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound request authorization.

use std::sync::Arc;

use murmur_session::SessionStore;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response};
use tracing::{debug, trace, warn};

use crate::error::Result;

/// Attaches the session token to every outbound request.
///
/// The token goes into `Authorization` verbatim, with no scheme prefix. The
/// header is replaced rather than appended, so authorizing the same request
/// twice yields the same request. Responses are passed back untouched; a 401
/// is the caller's to handle.
#[derive(Debug, Clone)]
pub struct AuthorizingPipeline {
	http: Client,
	session: Arc<SessionStore>,
}

impl AuthorizingPipeline {
	pub fn new(http: Client, session: Arc<SessionStore>) -> Self {
		Self { http, session }
	}

	pub fn http(&self) -> &Client {
		&self.http
	}

	pub fn session(&self) -> &Arc<SessionStore> {
		&self.session
	}

	/// Adds the current token to `request`, or returns it unchanged when
	/// signed out.
	pub fn authorize(&self, mut request: Request) -> Request {
		let Some(token) = self.session.current_token() else {
			trace!(url = %request.url(), "no session token; forwarding request unmodified");
			return request;
		};

		match HeaderValue::from_str(token.expose()) {
			Ok(mut value) => {
				value.set_sensitive(true);
				request.headers_mut().insert(AUTHORIZATION, value);
			}
			Err(_) => {
				warn!(url = %request.url(), "session token is not a valid header value; sending unauthorized");
			}
		}
		request
	}

	/// Authorizes and sends `request`.
	pub async fn execute(&self, request: Request) -> Result<Response> {
		let request = self.authorize(request);
		debug!(method = %request.method(), url = %request.url(), "sending request");
		Ok(self.http.execute(request).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use murmur_session::Token;
	use proptest::prelude::*;
	use reqwest::Method;

	fn pipeline() -> AuthorizingPipeline {
		AuthorizingPipeline::new(Client::new(), Arc::new(SessionStore::in_memory()))
	}

	fn request() -> Request {
		Request::new(Method::GET, "http://localhost:8080/posts".parse().unwrap())
	}

	#[test]
	fn leaves_request_alone_when_signed_out() {
		let authorized = pipeline().authorize(request());
		assert!(authorized.headers().get(AUTHORIZATION).is_none());
		assert_eq!(authorized.url().as_str(), "http://localhost:8080/posts");
		assert_eq!(authorized.method(), Method::GET);
	}

	#[test]
	fn attaches_token_verbatim() {
		let pipeline = pipeline();
		pipeline.session().set_token(Token::new("abc.def.ghi").unwrap());

		let authorized = pipeline.authorize(request());
		assert_eq!(authorized.headers()[AUTHORIZATION], "abc.def.ghi");
	}

	#[test]
	fn replaces_an_existing_authorization_header() {
		let pipeline = pipeline();
		pipeline.session().set_token(Token::new("fresh").unwrap());

		let mut stale = request();
		stale
			.headers_mut()
			.insert(AUTHORIZATION, HeaderValue::from_static("stale"));

		let authorized = pipeline.authorize(stale);
		let values: Vec<_> = authorized.headers().get_all(AUTHORIZATION).iter().collect();
		assert_eq!(values, vec!["fresh"]);
	}

	#[test]
	fn stops_authorizing_after_sign_out() {
		let pipeline = pipeline();
		pipeline.session().set_token(Token::new("abc").unwrap());
		pipeline.session().clear_token();

		assert!(pipeline.authorize(request()).headers().get(AUTHORIZATION).is_none());
	}

	#[test]
	fn header_unsafe_token_is_not_sent() {
		let pipeline = pipeline();
		pipeline.session().set_token(Token::new("bad\ntoken").unwrap());

		assert!(pipeline.authorize(request()).headers().get(AUTHORIZATION).is_none());
	}

	proptest! {
		/// Any header-safe token lands in the header exactly once, however many
		/// times the request passes through.
		#[test]
		fn authorization_is_exact_and_idempotent(token in "[A-Za-z0-9._~+/=-]{1,64}", passes in 1usize..4) {
			let pipeline = pipeline();
			pipeline.session().set_token(Token::new(token.clone()).unwrap());

			let mut req = request();
			for _ in 0..passes {
				req = pipeline.authorize(req);
			}
			let values: Vec<_> = req.headers().get_all(AUTHORIZATION).iter().collect();
			prop_assert_eq!(values.len(), 1);
			prop_assert_eq!(values[0].to_str().unwrap(), token.as_str());
		}
	}
}
