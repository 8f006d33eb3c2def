// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Opaque bearer token issued by the feed server.

use std::fmt;

use zeroize::Zeroize;

/// Placeholder printed wherever a token would otherwise appear.
pub const REDACTED: &str = "[REDACTED]";

/// A non-empty bearer token.
///
/// The server hands this out on login or registration and expects it back,
/// byte for byte, in the `Authorization` header. The value is never
/// interpreted by the client.
///
/// Debug and Display print [`REDACTED`], so a token can be passed to
/// `tracing` macros without leaking. The backing memory is zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct Token(String);

impl Token {
	/// Wraps a raw token. Returns `None` for the empty string, which the
	/// session treats the same as "no token".
	pub fn new(value: impl Into<String>) -> Option<Self> {
		let value = value.into();
		if value.is_empty() {
			None
		} else {
			Some(Self(value))
		}
	}

	/// The raw token, exactly as issued.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Token").field(&REDACTED).finish()
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn empty_string_is_not_a_token() {
		assert!(Token::new("").is_none());
		assert!(Token::new(String::new()).is_none());
	}

	#[test]
	fn expose_returns_value_verbatim() {
		let token = Token::new("eyJhbGciOiJIUzI1NiJ9.e30.sig").unwrap();
		assert_eq!(token.expose(), "eyJhbGciOiJIUzI1NiJ9.e30.sig");
	}

	#[test]
	fn whitespace_is_preserved() {
		let token = Token::new(" abc ").unwrap();
		assert_eq!(token.expose(), " abc ");
	}

	#[test]
	fn debug_and_display_are_redacted() {
		let token = Token::new("super-secret-session").unwrap();
		assert_eq!(format!("{token}"), REDACTED);
		let debug = format!("{token:?}");
		assert!(debug.contains(REDACTED));
		assert!(!debug.contains("super-secret-session"));
	}

	proptest! {
		#[test]
		fn debug_never_contains_token(inner in "[a-zA-Z0-9._-]{8,64}") {
			prop_assume!(!inner.contains("REDACTED"));
			prop_assume!(!inner.contains("Token"));
			let token = Token::new(inner.clone()).unwrap();
			let debug = format!("{:?}", token);
			prop_assert!(!debug.contains(&inner));
		}

		#[test]
		fn non_empty_input_always_yields_token(inner in ".+") {
			let token = Token::new(inner.clone());
			prop_assert_eq!(token.map(|t| t.expose().to_string()), Some(inner));
		}
	}
}
