// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;

/// Waits out the delay between a dropped connection and the next attempt.
#[async_trait]
pub trait ReconnectTimer: Send + Sync + 'static {
	async fn sleep(&self, delay: Duration);
}

/// Wall-clock timer backed by the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl ReconnectTimer for TokioTimer {
	async fn sleep(&self, delay: Duration) {
		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn tokio_timer_waits_for_the_full_delay() {
		let start = tokio::time::Instant::now();
		TokioTimer.sleep(Duration::from_millis(30)).await;
		assert!(start.elapsed() >= Duration::from_millis(30));
	}
}
