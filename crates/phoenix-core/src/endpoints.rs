// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Endpoint templating for API modules.
//!
//! Endpoints are derived from the `{module}` templates in the configuration
//! plus a version segment, and redundant slashes are collapsed so sloppy
//! templates still produce valid URLs.

use crate::config::PhoenixConfig;

/// Resolved base URLs for one API module.
#[derive(Debug, Clone)]
pub struct Endpoints {
	module_base: String,
	api_base: String,
}

impl Endpoints {
	/// Resolves the endpoints for a module name and API version.
	pub fn new(config: &PhoenixConfig, module: &str, api_version: &str) -> Self {
		let module_base = with_version(
			&config.module_endpoint.replace("{module}", module),
			api_version,
		);
		let api_base = with_version(&config.api_endpoint.replace("{module}", module), api_version);

		Self {
			module_base,
			api_base,
		}
	}

	/// Full URL for a path under the module endpoint.
	pub fn module_url(&self, path: &str) -> String {
		collapse_slashes(&format!("{}{}", self.module_base, path))
	}

	/// Full URL for a path under the cross-module API endpoint.
	pub fn api_url(&self, path: &str) -> String {
		collapse_slashes(&format!("{}{}", self.api_base, path))
	}
}

fn with_version(base: &str, version: &str) -> String {
	if base.ends_with('/') {
		format!("{base}{version}/")
	} else {
		format!("{base}/{version}/")
	}
}

/// Collapses runs of slashes anywhere after the scheme separator.
fn collapse_slashes(url: &str) -> String {
	let (scheme, rest) = match url.find("://") {
		Some(idx) => url.split_at(idx + 3),
		None => ("", url),
	};

	let mut out = String::with_capacity(url.len());
	out.push_str(scheme);

	let mut previous_slash = false;
	for ch in rest.chars() {
		if ch == '/' {
			if previous_slash {
				continue;
			}
			previous_slash = true;
		} else {
			previous_slash = false;
		}
		out.push(ch);
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::PhoenixConfig;
	use proptest::prelude::*;

	fn config() -> PhoenixConfig {
		PhoenixConfig::builder()
			.client_id("client")
			.client_secret("secret")
			.project_id("2000")
			.build()
			.unwrap()
	}

	#[test]
	fn module_url_substitutes_module_and_version() {
		let endpoints = Endpoints::new(&config(), "identity", "v2");
		assert_eq!(
			endpoints.module_url("token"),
			"https://identity.phoenixplatform.com.sg/v2/token"
		);
	}

	#[test]
	fn api_url_substitutes_module_and_version() {
		let endpoints = Endpoints::new(&config(), "analytics", "v1");
		assert_eq!(
			endpoints.api_url("projects/2000/events"),
			"https://api.phoenixplatform.com/analytics/v1/projects/2000/events"
		);
	}

	#[test]
	fn redundant_slashes_are_collapsed() {
		let endpoints = Endpoints::new(&config(), "identity", "v2");
		assert_eq!(
			endpoints.module_url("//providers//300"),
			"https://identity.phoenixplatform.com.sg/v2/providers/300"
		);
	}

	#[test]
	fn missing_trailing_slash_in_template_is_tolerated() {
		let config = PhoenixConfig::builder()
			.client_id("client")
			.client_secret("secret")
			.project_id("2000")
			.module_endpoint("https://{module}.example.com")
			.build()
			.unwrap();

		let endpoints = Endpoints::new(&config, "analytics", "v2");
		assert_eq!(
			endpoints.module_url("projects/2000/events"),
			"https://analytics.example.com/v2/projects/2000/events"
		);
	}

	#[test]
	fn scheme_separator_is_preserved() {
		assert_eq!(
			collapse_slashes("https://a.example.com//v2//x"),
			"https://a.example.com/v2/x"
		);
		assert_eq!(collapse_slashes("a//b"), "a/b");
	}

	proptest! {
		#[test]
		fn collapse_is_idempotent(path in "[a-z/]{0,40}") {
			let url = format!("https://host.example.com/{path}");
			let once = collapse_slashes(&url);
			prop_assert_eq!(collapse_slashes(&once), once.clone());
			prop_assert!(!once["https://".len()..].contains("//"));
		}
	}
}
