// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Geolocation and public-IP capability seams.

use std::sync::Arc;

use async_trait::async_trait;
use phoenix_http::{ApiRequest, HttpTransport, TransportError};
use thiserror::Error;

/// A geolocation reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
	pub latitude: f64,
	pub longitude: f64,
	/// Accuracy of the reading in meters.
	pub accuracy: f64,
}

/// Geolocation failures.
#[derive(Debug, Error)]
pub enum GeoError {
	/// The user explicitly denied permission. Don't try again.
	#[error("geolocation permission denied")]
	PermissionDenied,

	/// Position is currently unavailable. Okay to try again.
	#[error("position unavailable")]
	Unavailable,

	/// The lookup timed out. Okay to try again.
	#[error("geolocation timed out")]
	Timeout,
}

/// Source of geolocation readings, supplied by the host application.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
	/// Returns the current position.
	async fn current_position(&self) -> Result<GeoPosition, GeoError>;
}

/// Source of the device's public IP address.
#[async_trait]
pub trait IpResolver: Send + Sync {
	/// Returns the public IP as a string.
	async fn public_ip(&self) -> Result<String, TransportError>;
}

/// Resolver backed by the ipify.org lookup service.
pub struct IpifyResolver {
	transport: Arc<dyn HttpTransport>,
	url: String,
}

impl IpifyResolver {
	/// Creates a resolver using the given transport.
	pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
		Self {
			transport,
			url: "https://api.ipify.org?format=json".to_string(),
		}
	}

	/// Overrides the lookup URL.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = url.into();
		self
	}
}

#[async_trait]
impl IpResolver for IpifyResolver {
	async fn public_ip(&self) -> Result<String, TransportError> {
		let response = self.transport.request(ApiRequest::get(&self.url)).await?;

		// Some deployments answer text/plain; the transport wraps those
		// bodies under "response".
		let ip = response.body["ip"]
			.as_str()
			.map(str::to_string)
			.or_else(|| {
				response.body["response"]
					.as_str()
					.and_then(|text| serde_json::from_str::<serde_json::Value>(text).ok())
					.and_then(|value| value["ip"].as_str().map(str::to_string))
			})
			.unwrap_or_default();
		Ok(ip)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use phoenix_http::ApiResponse;
	use std::collections::HashMap;

	struct FixedTransport {
		body: serde_json::Value,
	}

	#[async_trait]
	impl HttpTransport for FixedTransport {
		async fn request(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
			Ok(ApiResponse {
				status: 200,
				success: true,
				headers: HashMap::new(),
				body: self.body.clone(),
			})
		}
	}

	#[tokio::test]
	async fn resolves_json_body() {
		let resolver = IpifyResolver::new(Arc::new(FixedTransport {
			body: serde_json::json!({"ip": "203.0.113.7"}),
		}));

		assert_eq!(resolver.public_ip().await.unwrap(), "203.0.113.7");
	}

	#[tokio::test]
	async fn resolves_wrapped_text_body() {
		let resolver = IpifyResolver::new(Arc::new(FixedTransport {
			body: serde_json::json!({"response": "{\"ip\":\"198.51.100.4\"}"}),
		}));

		assert_eq!(resolver.public_ip().await.unwrap(), "198.51.100.4");
	}

	#[tokio::test]
	async fn unparseable_body_yields_empty() {
		let resolver = IpifyResolver::new(Arc::new(FixedTransport {
			body: serde_json::json!({"response": "not json"}),
		}));

		assert_eq!(resolver.public_ip().await.unwrap(), "");
	}
}
