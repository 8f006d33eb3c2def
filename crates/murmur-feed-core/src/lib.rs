// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types shared by the Murmur SDK and CLI.
//!
//! - [`Post`]: a feed entry, with decode-and-validate for push messages
//! - [`Credentials`], [`AuthResponse`], [`CreatePostRequest`],
//!   [`ErrorResponse`]: REST bodies
//! - [`ValidationError`]: input rejected before any network call

pub mod error;
pub mod post;
pub mod wire;

pub use error::ValidationError;
pub use post::{validate_content, Post};
pub use wire::{AuthResponse, CreatePostRequest, Credentials, ErrorResponse};
