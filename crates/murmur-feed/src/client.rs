// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! REST client for the feed server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use murmur_feed_core::{
	validate_content, AuthResponse, CreatePostRequest, Credentials, ErrorResponse, Post,
};
use murmur_session::{SessionStore, Token};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{FeedError, Result};
use crate::pipeline::AuthorizingPipeline;

/// The two REST calls the feed aggregator depends on.
#[async_trait]
pub trait FeedApi: Send + Sync {
	/// `GET /posts`, newest first.
	async fn list_posts(&self) -> Result<Vec<Post>>;

	/// `POST /posts`. Returns the stored post as the server echoes it.
	async fn create_post(&self, content: &str) -> Result<Post>;
}

/// Typed access to the feed server's REST endpoints.
///
/// Every request goes through an [`AuthorizingPipeline`], so whatever token
/// the session holds at send time is attached.
#[derive(Debug, Clone)]
pub struct FeedClient {
	base_url: Url,
	pipeline: AuthorizingPipeline,
}

impl FeedClient {
	pub fn new(base_url: &str, pipeline: AuthorizingPipeline) -> Result<Self> {
		let mut base_url = Url::parse(base_url)?;
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}
		Ok(Self { base_url, pipeline })
	}

	/// Builds a client with the standard HTTP stack around `session`.
	pub fn with_session(
		base_url: &str,
		session: Arc<SessionStore>,
		timeout: Duration,
	) -> Result<Self> {
		let http = murmur_common_http::new_client_with_timeout(timeout);
		Self::new(base_url, AuthorizingPipeline::new(http, session))
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	pub fn session(&self) -> &Arc<SessionStore> {
		self.pipeline.session()
	}

	pub fn pipeline(&self) -> &AuthorizingPipeline {
		&self.pipeline
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		Ok(self.base_url.join(path)?)
	}

	/// Creates an account and signs in with the token the server returns.
	#[instrument(skip(self, credentials), fields(username = %credentials.username))]
	pub async fn register(&self, credentials: &Credentials) -> Result<()> {
		self.authenticate("register", credentials).await
	}

	/// Exchanges credentials for a token and stores it in the session.
	#[instrument(skip(self, credentials), fields(username = %credentials.username))]
	pub async fn login(&self, credentials: &Credentials) -> Result<()> {
		self.authenticate("login", credentials).await
	}

	/// Clears the session. Purely local; the server keeps no session state.
	pub fn logout(&self) {
		self.session().clear_token();
		info!("signed out");
	}

	async fn authenticate(&self, path: &str, credentials: &Credentials) -> Result<()> {
		credentials.validate()?;

		let request = self
			.pipeline
			.http()
			.request(Method::POST, self.endpoint(path)?)
			.json(credentials)
			.build()?;
		let response = self.pipeline.execute(request).await?;

		if !response.status().is_success() {
			let (status, message) = error_message(response).await;
			warn!(status, %message, "authentication rejected");
			return Err(FeedError::Authentication(message));
		}

		let body: AuthResponse = decode_body(response).await?;
		let token = body
			.token
			.and_then(Token::new)
			.ok_or_else(|| FeedError::Authentication("server returned no token".to_string()))?;

		self.session().set_token(token);
		info!("signed in");
		Ok(())
	}
}

#[async_trait]
impl FeedApi for FeedClient {
	#[instrument(skip(self))]
	async fn list_posts(&self) -> Result<Vec<Post>> {
		let request = self
			.pipeline
			.http()
			.request(Method::GET, self.endpoint("posts")?)
			.build()?;
		let response = check_status(self.pipeline.execute(request).await?).await?;

		// An empty collection may come back as `null`.
		let posts: Option<Vec<Post>> = decode_body(response).await?;
		let posts = posts.unwrap_or_default();
		debug!(count = posts.len(), "fetched posts");
		Ok(posts)
	}

	#[instrument(skip(self, content))]
	async fn create_post(&self, content: &str) -> Result<Post> {
		let content = validate_content(content)?;

		let request = self
			.pipeline
			.http()
			.request(Method::POST, self.endpoint("posts")?)
			.json(&CreatePostRequest { content })
			.build()?;
		let response = check_status(self.pipeline.execute(request).await?).await?;

		let post: Post = decode_body(response).await?;
		debug!(id = %post.id, "created post");
		Ok(post)
	}
}

async fn check_status(response: Response) -> Result<Response> {
	if response.status().is_success() {
		return Ok(response);
	}
	let (status, message) = error_message(response).await;
	Err(FeedError::Server { status, message })
}

/// Pulls the server's `{"error": ...}` message out of a failed response,
/// falling back to the raw body and then the status reason.
async fn error_message(response: Response) -> (u16, String) {
	let status = response.status();
	let body = response.text().await.unwrap_or_default();

	let message = match serde_json::from_str::<ErrorResponse>(&body) {
		Ok(envelope) => envelope.error,
		Err(_) if !body.trim().is_empty() => body,
		Err(_) => status
			.canonical_reason()
			.unwrap_or("request failed")
			.to_string(),
	};
	(status.as_u16(), message)
}

async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T> {
	let bytes = response.bytes().await?;
	serde_json::from_slice(&bytes).map_err(|e| FeedError::InvalidResponse(e.to_string()))
}
