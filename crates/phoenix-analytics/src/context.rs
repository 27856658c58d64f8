// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Static and dynamic metadata stamped onto every event.
//!
//! The static snapshot is taken once; there is no point rebuilding it for
//! every call. The dynamic parts (public IP, authenticated user, latest
//! geolocation reading) are updated as they arrive.

use std::sync::RwLock;

use phoenix_core::PhoenixConfig;
use serde_json::{Map, Value};

use crate::event::{Event, EventCredentials, Geolocation};
use crate::geo::GeoPosition;

/// SDK version stamped into `ApplicationVersion`.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-time snapshot of the device and host application.
#[derive(Debug, Clone)]
pub struct DeviceContext {
	/// Code name of the runtime.
	pub app_code_name: String,
	/// Name of the host application.
	pub app_name: String,
	/// Version of the host application.
	pub app_version: String,
	/// Hardware platform.
	pub platform: String,
	/// Operating system identifier.
	pub user_agent: String,
	/// BCP-47 locale, when known.
	pub language: Option<String>,
	/// Screen dimensions, when known.
	pub screen_width: Option<u32>,
	pub screen_height: Option<u32>,
	/// Stable device fingerprint, when available.
	pub device_id: Option<String>,
}

impl DeviceContext {
	/// Snapshot of the current process and host.
	pub fn host() -> Self {
		let app_name = std::env::current_exe()
			.ok()
			.and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
			.unwrap_or_else(|| "unknown".to_string());

		Self {
			app_code_name: "rust".to_string(),
			app_name,
			app_version: SDK_VERSION.to_string(),
			platform: std::env::consts::ARCH.to_string(),
			user_agent: std::env::consts::OS.to_string(),
			language: std::env::var("LANG").ok(),
			screen_width: None,
			screen_height: None,
			device_id: None,
		}
	}

	/// Sets the host application name and version.
	pub fn with_app(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
		self.app_name = name.into();
		self.app_version = version.into();
		self
	}

	/// Sets the device fingerprint.
	pub fn with_device_id(mut self, id: impl Into<String>) -> Self {
		self.device_id = Some(id.into());
		self
	}

	fn metadata(&self) -> Map<String, Value> {
		let mut metadata = Map::new();
		metadata.insert("appCodeName".to_string(), self.app_code_name.clone().into());
		metadata.insert("appName".to_string(), self.app_name.clone().into());
		metadata.insert("appVersion".to_string(), self.app_version.clone().into());
		metadata.insert("platform".to_string(), self.platform.clone().into());
		metadata.insert("userAgent".to_string(), self.user_agent.clone().into());
		if let Some(language) = &self.language {
			metadata.insert("language".to_string(), language.clone().into());
		}
		if let Some(width) = self.screen_width {
			metadata.insert("width".to_string(), width.into());
		}
		if let Some(height) = self.screen_height {
			metadata.insert("height".to_string(), height.into());
		}
		if let Some(device_id) = &self.device_id {
			metadata.insert("DeviceId".to_string(), device_id.clone().into());
		}
		metadata
	}
}

#[derive(Debug, Default)]
struct DynamicContext {
	ip_address: Option<String>,
	user_id: Option<String>,
	geo: Option<GeoPosition>,
}

/// Event stamping context shared by the queue and its background tasks.
#[derive(Debug)]
pub struct EventContext {
	project_id: String,
	target_id: String,
	application_id: String,
	device_type: String,
	operating_system_version: String,
	base_metadata: Map<String, Value>,
	dynamic: RwLock<DynamicContext>,
}

impl EventContext {
	/// Builds the context from the configuration and a device snapshot.
	pub fn new(config: &PhoenixConfig, device: DeviceContext) -> Self {
		Self {
			project_id: config.event_project_id().to_string(),
			target_id: config.event_application_id().to_string(),
			application_id: config.event_application_id().to_string(),
			device_type: device.app_version.clone(),
			operating_system_version: device.platform.clone(),
			base_metadata: device.metadata(),
			dynamic: RwLock::new(DynamicContext::default()),
		}
	}

	/// Records the resolved public IP.
	pub fn set_ip_address(&self, ip: impl Into<String>) {
		let ip = ip.into();
		if ip.is_empty() {
			return;
		}
		self.dynamic.write().expect("context lock poisoned").ip_address = Some(ip);
	}

	/// Records the authenticated user id.
	pub fn set_user_id(&self, id: impl Into<String>) {
		self.dynamic.write().expect("context lock poisoned").user_id = Some(id.into());
	}

	/// Records the latest geolocation reading.
	pub fn set_geo(&self, position: GeoPosition) {
		self.dynamic.write().expect("context lock poisoned").geo = Some(position);
	}

	/// Returns the latest geolocation reading, if any.
	pub fn geo(&self) -> Option<GeoPosition> {
		self.dynamic.read().expect("context lock poisoned").geo
	}

	/// Constructs an event, merging the static snapshot, the call-site
	/// metadata and any geolocation reading.
	///
	/// On key conflicts the static snapshot wins over call-site metadata,
	/// matching the platform's established merge order.
	pub fn build_event(
		&self,
		credentials: EventCredentials,
		event_type: &str,
		metadata: Option<Map<String, Value>>,
		date: Option<chrono::DateTime<chrono::Utc>>,
	) -> Event {
		let mut merged = metadata.unwrap_or_default();
		for (key, value) in &self.base_metadata {
			merged.insert(key.clone(), value.clone());
		}

		let dynamic = self.dynamic.read().expect("context lock poisoned");

		let geolocation = dynamic.geo.map(|position| {
			merged.insert("latitude".to_string(), position.latitude.into());
			merged.insert("longitude".to_string(), position.longitude.into());
			merged.insert("geoAccuracy".to_string(), position.accuracy.into());
			Geolocation {
				latitude: position.latitude,
				longitude: position.longitude,
			}
		});

		Event {
			event_date: date.unwrap_or_else(chrono::Utc::now),
			event_type: event_type.to_string(),
			metadata: merged,
			project_id: self.project_id.clone(),
			event_value: 1,
			target_id: self.target_id.clone(),
			application_id: self.application_id.clone(),
			application_version: SDK_VERSION.to_string(),
			device_type: self.device_type.clone(),
			operating_system_version: self.operating_system_version.clone(),
			geolocation,
			user_id: dynamic.user_id.clone(),
			ip_address: dynamic.ip_address.clone(),
			credentials: Some(credentials),
		}
	}
}
