// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use murmur_feed_core::Post;

/// One line per post: `2024-01-01 12:00  @alice  hello`.
///
/// Newlines in content are flattened so a post never spans lines.
pub fn format_post(post: &Post) -> String {
	let content = post.content.split_whitespace().collect::<Vec<_>>().join(" ");
	format!(
		"{}  @{}  {}",
		post.created_at.format("%Y-%m-%d %H:%M"),
		post.username,
		content
	)
}
