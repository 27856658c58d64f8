// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics module.

use phoenix_http::TransportError;
use thiserror::Error;

/// Analytics errors.
///
/// Flush failures are handled inside the queue (retried, never surfaced to
/// the caller that enqueued the event), so these mostly show up in logs and
/// in direct uses of the fetch helpers.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// The HTTP request never produced a response.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The server rejected the batch.
	#[error("server error ({status})")]
	Server {
		status: u16,
		body: serde_json::Value,
	},

	/// The event batch could not be serialized.
	#[error("serialization failed: {0}")]
	Serialization(String),
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
