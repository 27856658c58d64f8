// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SDK configuration and validation.

use std::time::Duration;

use thiserror::Error;

/// Configuration errors raised synchronously when building a [`PhoenixConfig`].
///
/// These are the only fatal errors in the SDK: without client credentials and
/// a project there is nothing useful the SDK can do, so construction aborts
/// instead of surfacing the problem later.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// No client id was provided.
	#[error("a client id must be provided")]
	MissingClientId,

	/// No client secret was provided.
	#[error("a client secret must be provided")]
	MissingClientSecret,

	/// No project id was provided.
	#[error("a project id must be provided")]
	MissingProjectId,
}

/// How the event flusher handles a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushRetryMode {
	/// Discard the failed batch and immediately re-flush the remaining queue.
	///
	/// This matches the platform's historical behaviour: events that were
	/// already spliced out of the queue are lost on failure.
	#[default]
	Discard,

	/// Re-queue the failed batch at the head and retry with bounded,
	/// jittered exponential backoff. Events survive transient outages but
	/// delivery order relative to newly enqueued events is preserved.
	Requeue,
}

/// Identity module options.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
	/// API module name substituted into the endpoint template.
	pub module: String,
	/// API module name for the token grant and validate endpoints.
	pub auth_module: String,
	/// API version segment appended to module URLs.
	pub api_version: String,
	/// Hash passwords (uppercase MD5) before they cross the wire.
	pub md5_hash: bool,
	/// Path of the token grant endpoint, relative to the module URL.
	pub token_path: String,
	/// Path of the validate endpoint, relative to the module URL.
	pub validate_path: String,
}

impl Default for IdentityConfig {
	fn default() -> Self {
		Self {
			module: "identity".to_string(),
			auth_module: "authentication".to_string(),
			api_version: "v2".to_string(),
			md5_hash: true,
			token_path: "token".to_string(),
			validate_path: "validate".to_string(),
		}
	}
}

/// Analytics module options.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
	/// API module name substituted into the endpoint template.
	pub module: String,
	/// API version segment appended to module URLs.
	pub api_version: String,
	/// Request geolocation readings and attach them to events.
	pub use_geolocation: bool,
	/// Interval between geolocation refreshes.
	pub location_refresh_interval: Duration,
	/// Interval between public IP refreshes.
	pub ip_refresh_interval: Duration,
	/// Interval between automatic queue flushes.
	pub event_flush_interval: Duration,
	/// Maximum number of events to send in one flush batch.
	pub event_max_processed: usize,
	/// Failure handling for flush batches.
	pub retry_mode: FlushRetryMode,
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		Self {
			module: "analytics".to_string(),
			api_version: "v2".to_string(),
			use_geolocation: false,
			location_refresh_interval: Duration::from_secs(60),
			ip_refresh_interval: Duration::from_secs(60),
			event_flush_interval: Duration::from_secs(5),
			event_max_processed: 50,
			retry_mode: FlushRetryMode::Discard,
		}
	}
}

/// Complete SDK configuration.
///
/// Built through [`PhoenixConfig::builder`]; the required client id, client
/// secret and project id are validated at build time.
#[derive(Debug, Clone)]
pub struct PhoenixConfig {
	/// Client identifier issued during project setup.
	pub client_id: String,
	/// Client secret issued during project setup.
	pub client_secret: String,
	/// Project the SDK authenticates against.
	pub project_id: String,
	/// Application the SDK authenticates against.
	pub application_id: String,
	/// Project events are attributed to; defaults to `project_id`.
	pub event_project_id: Option<String>,
	/// Application events are attributed to; defaults to `application_id`.
	pub event_application_id: Option<String>,
	/// Provider the SDK communicates with.
	pub provider_id: u64,
	/// Per-module endpoint template; `{module}` is substituted.
	pub module_endpoint: String,
	/// Cross-module API endpoint template; `{module}` is substituted.
	pub api_endpoint: String,
	/// Storage key used for the remembered access token.
	pub access_token_key: String,
	/// Identity options.
	pub identity: IdentityConfig,
	/// Analytics options.
	pub analytics: AnalyticsConfig,
}

impl PhoenixConfig {
	/// Creates a builder with platform defaults.
	pub fn builder() -> PhoenixConfigBuilder {
		PhoenixConfigBuilder::new()
	}

	/// Project id that events are attributed to.
	pub fn event_project_id(&self) -> &str {
		self.event_project_id.as_deref().unwrap_or(&self.project_id)
	}

	/// Application id that events are attributed to.
	pub fn event_application_id(&self) -> &str {
		self
			.event_application_id
			.as_deref()
			.unwrap_or(&self.application_id)
	}
}

/// Builder for [`PhoenixConfig`].
#[derive(Debug, Default)]
pub struct PhoenixConfigBuilder {
	client_id: Option<String>,
	client_secret: Option<String>,
	project_id: Option<String>,
	application_id: Option<String>,
	event_project_id: Option<String>,
	event_application_id: Option<String>,
	provider_id: Option<u64>,
	module_endpoint: Option<String>,
	api_endpoint: Option<String>,
	access_token_key: Option<String>,
	identity: IdentityConfig,
	analytics: AnalyticsConfig,
}

impl PhoenixConfigBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the client identifier (required).
	pub fn client_id(mut self, id: impl Into<String>) -> Self {
		self.client_id = Some(id.into());
		self
	}

	/// Sets the client secret (required).
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());
		self
	}

	/// Sets the project id (required).
	pub fn project_id(mut self, id: impl Into<String>) -> Self {
		self.project_id = Some(id.into());
		self
	}

	/// Sets the application id.
	pub fn application_id(mut self, id: impl Into<String>) -> Self {
		self.application_id = Some(id.into());
		self
	}

	/// Overrides the project id used for event attribution.
	pub fn event_project_id(mut self, id: impl Into<String>) -> Self {
		self.event_project_id = Some(id.into());
		self
	}

	/// Overrides the application id used for event attribution.
	pub fn event_application_id(mut self, id: impl Into<String>) -> Self {
		self.event_application_id = Some(id.into());
		self
	}

	/// Sets the provider id.
	pub fn provider_id(mut self, id: u64) -> Self {
		self.provider_id = Some(id);
		self
	}

	/// Sets the per-module endpoint template.
	///
	/// Example: `https://{module}.phoenixplatform.com.sg/`
	pub fn module_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.module_endpoint = Some(endpoint.into());
		self
	}

	/// Sets the cross-module API endpoint template.
	pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.api_endpoint = Some(endpoint.into());
		self
	}

	/// Sets the storage key for the remembered access token.
	pub fn access_token_key(mut self, key: impl Into<String>) -> Self {
		self.access_token_key = Some(key.into());
		self
	}

	/// Enables or disables password hashing before transmission.
	pub fn md5_hash(mut self, enabled: bool) -> Self {
		self.identity.md5_hash = enabled;
		self
	}

	/// Enables or disables geolocation capture for events.
	pub fn use_geolocation(mut self, enabled: bool) -> Self {
		self.analytics.use_geolocation = enabled;
		self
	}

	/// Sets the automatic flush interval.
	pub fn event_flush_interval(mut self, interval: Duration) -> Self {
		self.analytics.event_flush_interval = interval;
		self
	}

	/// Sets the maximum flush batch size.
	pub fn event_max_processed(mut self, max: usize) -> Self {
		self.analytics.event_max_processed = max;
		self
	}

	/// Sets the flush failure handling mode.
	pub fn retry_mode(mut self, mode: FlushRetryMode) -> Self {
		self.analytics.retry_mode = mode;
		self
	}

	/// Replaces the identity options wholesale.
	pub fn identity(mut self, identity: IdentityConfig) -> Self {
		self.identity = identity;
		self
	}

	/// Replaces the analytics options wholesale.
	pub fn analytics(mut self, analytics: AnalyticsConfig) -> Self {
		self.analytics = analytics;
		self
	}

	/// Validates and builds the configuration.
	pub fn build(self) -> Result<PhoenixConfig, ConfigError> {
		let client_id = self.client_id.ok_or(ConfigError::MissingClientId)?;
		let client_secret = self.client_secret.ok_or(ConfigError::MissingClientSecret)?;
		let project_id = self.project_id.ok_or(ConfigError::MissingProjectId)?;

		Ok(PhoenixConfig {
			application_id: self.application_id.unwrap_or_else(|| project_id.clone()),
			client_id,
			client_secret,
			project_id,
			event_project_id: self.event_project_id,
			event_application_id: self.event_application_id,
			provider_id: self.provider_id.unwrap_or(300),
			module_endpoint: self
				.module_endpoint
				.unwrap_or_else(|| "https://{module}.phoenixplatform.com.sg/".to_string()),
			api_endpoint: self
				.api_endpoint
				.unwrap_or_else(|| "https://api.phoenixplatform.com/{module}/".to_string()),
			access_token_key: self
				.access_token_key
				.unwrap_or_else(|| "intelligence-access-token".to_string()),
			identity: self.identity,
			analytics: self.analytics,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn minimal() -> PhoenixConfigBuilder {
		PhoenixConfig::builder()
			.client_id("client")
			.client_secret("secret")
			.project_id("2000")
	}

	#[test]
	fn build_requires_client_id() {
		let result = PhoenixConfig::builder()
			.client_secret("secret")
			.project_id("2000")
			.build();
		assert!(matches!(result, Err(ConfigError::MissingClientId)));
	}

	#[test]
	fn build_requires_client_secret() {
		let result = PhoenixConfig::builder()
			.client_id("client")
			.project_id("2000")
			.build();
		assert!(matches!(result, Err(ConfigError::MissingClientSecret)));
	}

	#[test]
	fn build_requires_project_id() {
		let result = PhoenixConfig::builder()
			.client_id("client")
			.client_secret("secret")
			.build();
		assert!(matches!(result, Err(ConfigError::MissingProjectId)));
	}

	#[test]
	fn build_applies_platform_defaults() {
		let config = minimal().build().unwrap();

		assert_eq!(config.provider_id, 300);
		assert_eq!(config.access_token_key, "intelligence-access-token");
		assert!(config.identity.md5_hash);
		assert!(!config.analytics.use_geolocation);
		assert_eq!(config.analytics.event_max_processed, 50);
		assert_eq!(config.analytics.event_flush_interval, Duration::from_secs(5));
		assert_eq!(config.analytics.retry_mode, FlushRetryMode::Discard);
	}

	#[test]
	fn event_ids_fall_back_to_primary_ids() {
		let config = minimal().application_id("9000").build().unwrap();
		assert_eq!(config.event_project_id(), "2000");
		assert_eq!(config.event_application_id(), "9000");

		let config = minimal()
			.application_id("9000")
			.event_project_id("2001")
			.event_application_id("9001")
			.build()
			.unwrap();
		assert_eq!(config.event_project_id(), "2001");
		assert_eq!(config.event_application_id(), "9001");
	}

	#[test]
	fn application_id_defaults_to_project_id() {
		let config = minimal().build().unwrap();
		assert_eq!(config.application_id, "2000");
	}
}
