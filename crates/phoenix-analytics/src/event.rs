// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The analytics event wire type.
//!
//! Property names follow the platform's PascalCase convention. The token
//! credentials an event was enqueued under are transient: they select the
//! batch Authorization header and are never serialized.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Credentials an event is enqueued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCredentials {
	/// Normalized token type, e.g. `Bearer`.
	pub token_type: String,
	/// The raw access token.
	pub access_token: String,
}

/// Top-level geolocation attached to an event.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Geolocation {
	#[serde(rename = "Latitude")]
	pub latitude: f64,
	#[serde(rename = "Longitude")]
	pub longitude: f64,
}

/// A single analytics event.
///
/// Immutable once queued; the queue drains events in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
	#[serde(rename = "EventDate")]
	pub event_date: DateTime<Utc>,
	#[serde(rename = "EventType")]
	pub event_type: String,
	#[serde(rename = "Metadata")]
	pub metadata: Map<String, Value>,
	#[serde(rename = "ProjectId")]
	pub project_id: String,
	#[serde(rename = "EventValue")]
	pub event_value: u32,
	#[serde(rename = "TargetId")]
	pub target_id: String,
	#[serde(rename = "PhoenixIdentity_ApplicationId")]
	pub application_id: String,
	#[serde(rename = "ApplicationVersion")]
	pub application_version: String,
	#[serde(rename = "DeviceType")]
	pub device_type: String,
	#[serde(rename = "OperatingSystemVersion")]
	pub operating_system_version: String,
	#[serde(rename = "Geolocation", skip_serializing_if = "Option::is_none")]
	pub geolocation: Option<Geolocation>,
	#[serde(rename = "PhoenixIdentity_UserId", skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(rename = "IpAddress", skip_serializing_if = "Option::is_none")]
	pub ip_address: Option<String>,
	/// Stripped before transmission; the first event of a batch supplies the
	/// shared Authorization header.
	#[serde(skip)]
	pub credentials: Option<EventCredentials>,
}
