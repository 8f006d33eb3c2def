// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod auth;
mod feed;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use murmur_cli_config::{load_config_with_cli, CliOverrides, LogFormat, LoggingConfig};
use murmur_feed::FeedClient;
use murmur_session::{FileTokenStorage, SessionStore};

#[derive(Parser, Debug)]
#[command(name = "murmur", version, about = "Realtime social feed client")]
struct Args {
	/// Feed server base URL
	#[arg(long, global = true)]
	server_url: Option<String>,

	/// Additional config file, applied over ~/.config/murmur/config.toml
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Log level (error, warn, info, debug, trace)
	#[arg(long, global = true)]
	log_level: Option<String>,

	/// Emit logs as JSON
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create an account and sign in
	Register {
		username: String,
		/// Read from stdin when omitted
		#[arg(long, env = "MURMUR_PASSWORD", hide_env_values = true)]
		password: Option<String>,
	},
	/// Sign in with an existing account
	Login {
		username: String,
		/// Read from stdin when omitted
		#[arg(long, env = "MURMUR_PASSWORD", hide_env_values = true)]
		password: Option<String>,
	},
	/// Forget the stored session
	Logout,
	/// Show whether a session is stored
	Status,
	/// Print the feed, then follow new posts
	Feed {
		/// Print the current feed and exit
		#[arg(long)]
		no_follow: bool,
		/// Only print the newest N posts of the snapshot
		#[arg(long)]
		limit: Option<usize>,
	},
	/// Publish a post
	Post {
		#[arg(required = true, num_args = 1..)]
		content: Vec<String>,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_config_with_cli(CliOverrides {
		server_url: args.server_url.clone(),
		log_level: args.log_level.clone(),
		log_format: args.json_logs.then(|| "json".to_string()),
		config_file: args.config.clone(),
	})
	.context("failed to load configuration")?;

	init_tracing(&config.logging);
	debug!(session_file = %config.session_file.display(), "using session file");

	let session = Arc::new(SessionStore::new(FileTokenStorage::new(
		config.session_file.clone(),
	)));
	let client = Arc::new(
		FeedClient::with_session(config.server_url.as_str(), session, config.request_timeout)
			.context("invalid server URL")?,
	);

	match args.command {
		Command::Register { username, password } => {
			let password = auth::resolve_password(password)?;
			auth::register(&client, &username, &password).await
		}
		Command::Login { username, password } => {
			let password = auth::resolve_password(password)?;
			auth::login(&client, &username, &password).await
		}
		Command::Logout => {
			auth::logout(&client);
			Ok(())
		}
		Command::Status => {
			auth::status(&client);
			Ok(())
		}
		Command::Feed { no_follow, limit } => feed::show(client, &config, !no_follow, limit).await,
		Command::Post { content } => feed::publish(client, &content.join(" ")).await,
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("murmur={}", logging.level.as_str())));

	// stdout carries the feed; logs go to stderr.
	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().pretty().with_writer(std::io::stderr))
				.init();
		}
	}
}
