// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the identity module.

use phoenix_http::TransportError;
use thiserror::Error;

/// Identity errors.
#[derive(Debug, Error)]
pub enum IdentityError {
	/// The HTTP request never produced a response.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The server rejected the request; the body carries its error payload.
	#[error("server error ({status})")]
	Server {
		status: u16,
		body: serde_json::Value,
	},

	/// The server responded with a body this SDK could not interpret.
	#[error("malformed server response: {0}")]
	Decode(#[from] serde_json::Error),

	/// No remembered token record exists.
	#[error("no token found")]
	NoTokenFound,

	/// The access token presented for expiry does not match the remembered
	/// record.
	#[error("invalid access token")]
	InvalidAccessToken,

	/// The token has been expired and its secrets cleared.
	#[error("the token has been expired")]
	TokenExpired,

	/// The `users/me` lookup returned no record.
	#[error("the server returned no user record")]
	MissingUser,

	/// The token store failed.
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// Token store errors.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("token store i/o failed: {0}")]
	Io(#[from] std::io::Error),

	#[error("token record could not be written: {0}")]
	Serialize(#[from] serde_json::Error),
}

/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
