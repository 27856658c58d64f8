// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The persisted access-token record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single remembered token record written to persistent storage.
///
/// Field names match the wire/storage format used by every SDK on the
/// platform, so a record written by one client can be read by another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
	#[serde(rename = "accessToken")]
	pub access_token: String,
	#[serde(rename = "tokenType")]
	pub token_type: String,
	#[serde(rename = "expiry")]
	pub expiry: DateTime<Utc>,
	#[serde(rename = "created")]
	pub created: DateTime<Utc>,
}
