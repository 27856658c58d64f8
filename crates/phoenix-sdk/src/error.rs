// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error type surfaced by the SDK facade.

use phoenix_core::ConfigError;
use phoenix_identity::IdentityError;
use thiserror::Error;

/// Errors surfaced by [`Phoenix`](crate::Phoenix).
#[derive(Debug, Error)]
pub enum PhoenixError {
	/// The SDK was misconfigured; nothing was started.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// An identity operation failed.
	#[error(transparent)]
	Identity(#[from] IdentityError),
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, PhoenixError>;
