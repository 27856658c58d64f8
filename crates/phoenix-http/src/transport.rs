// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The HTTP transport seam the SDK talks through.
//!
//! Components never touch reqwest directly; they build an [`ApiRequest`] and
//! hand it to an [`HttpTransport`]. Tests substitute in-process transports,
//! production wires in [`ReqwestTransport`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Transport-level failure: the request never produced an HTTP response.
///
/// Non-2xx responses are not transport errors; they come back as an
/// [`ApiResponse`] with `success == false` so callers can inspect the body.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The underlying HTTP request failed (connect, timeout, TLS, ...).
	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),
}

/// HTTP method subset used by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
	Delete,
}

/// Request body encodings used by the platform.
///
/// Token grants go form-encoded; event batches go as JSON arrays.
#[derive(Debug, Clone)]
pub enum RequestBody {
	Form(Vec<(String, String)>),
	Json(serde_json::Value),
}

/// A request handed to the transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
	pub method: Method,
	pub url: String,
	pub body: Option<RequestBody>,
	pub headers: Vec<(String, String)>,
}

impl ApiRequest {
	/// Creates a GET request.
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			method: Method::Get,
			url: url.into(),
			body: None,
			headers: Vec::new(),
		}
	}

	/// Creates a POST request with a form-encoded body.
	pub fn post_form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
		Self {
			method: Method::Post,
			url: url.into(),
			body: Some(RequestBody::Form(fields)),
			headers: Vec::new(),
		}
	}

	/// Creates a POST request with a JSON body.
	pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
		Self {
			method: Method::Post,
			url: url.into(),
			body: Some(RequestBody::Json(body)),
			headers: Vec::new(),
		}
	}

	/// Adds a header (builder pattern).
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// Adds the `Authorization: <TokenType> <AccessToken>` header.
	pub fn authorization(self, token_type: &str, access_token: &str) -> Self {
		self.header("Authorization", format!("{token_type} {access_token}"))
	}
}

/// A response from the transport.
#[derive(Debug, Clone)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// True for the 2xx range.
	pub success: bool,
	/// Response headers.
	pub headers: HashMap<String, String>,
	/// Parsed JSON body when the content type indicates JSON; other bodies
	/// are wrapped as `{"response": <text>}`.
	pub body: serde_json::Value,
}

/// The seam between the SDK and the network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
	/// Issues a request, returning the response or a transport failure.
	async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Production transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
	client: reqwest::Client,
}

impl ReqwestTransport {
	/// Creates a transport with the standard SDK client.
	pub fn new() -> Self {
		Self {
			client: crate::client::new_client(),
		}
	}

	/// Creates a transport with a custom request timeout.
	pub fn with_timeout(timeout: Duration) -> Self {
		Self {
			client: crate::client::new_client_with_timeout(timeout),
		}
	}
}

impl Default for ReqwestTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
	async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
		let mut builder = match request.method {
			Method::Get => self.client.get(&request.url),
			Method::Post => self.client.post(&request.url),
			Method::Delete => self.client.delete(&request.url),
		};

		for (name, value) in &request.headers {
			builder = builder.header(name, value);
		}

		builder = match request.body {
			Some(RequestBody::Form(fields)) => builder.form(&fields),
			Some(RequestBody::Json(value)) => builder.json(&value),
			None => builder,
		};

		let response = builder.send().await?;
		let status = response.status().as_u16();
		let success = response.status().is_success();

		let headers: HashMap<String, String> = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value
					.to_str()
					.ok()
					.map(|v| (name.as_str().to_string(), v.to_string()))
			})
			.collect();

		let is_json = headers
			.get("content-type")
			.map(|ct| ct.starts_with("application/json"))
			.unwrap_or(false);

		let text = response.text().await?;
		let body = if is_json {
			serde_json::from_str(&text).unwrap_or(serde_json::Value::Null)
		} else {
			serde_json::json!({ "response": text })
		};

		debug!(url = %request.url, status, success, "transport request completed");

		Ok(ApiResponse {
			status,
			success,
			headers,
			body,
		})
	}
}
