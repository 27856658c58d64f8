// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token grants, validation and identity retrieval against the platform.
//!
//! The service talks to two API modules: the authentication module for
//! token grants and validation, and the identity module for providers,
//! companies, projects and user records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use md5::{Digest, Md5};
use phoenix_analytics::EventSink;
use phoenix_core::{
	Bus, Company, Endpoints, PagedResponse, PhoenixConfig, Project, Provider, SdkEvent,
	StoredToken, TokenInfo, User,
};
use phoenix_http::{ApiRequest, ApiResponse, HttpTransport};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{IdentityError, Result};
use crate::store::TokenStore;
use crate::token::AccessToken;

/// Wire shape of a successful token grant or validation.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
	pub access_token: String,
	pub token_type: String,
	/// Lifetime of the token. The platform reports this in milliseconds.
	pub expires_in: i64,
	#[serde(default)]
	pub refresh_token: Option<String>,
}

struct ServiceInner {
	config: PhoenixConfig,
	auth: Endpoints,
	identity: Endpoints,
	transport: Arc<dyn HttpTransport>,
	store: Arc<dyn TokenStore>,
	bus: Bus,
	sink: EventSink,
	resolving: AtomicBool,
}

/// The identity service. Cheap to clone; all handles share one state.
#[derive(Clone)]
pub struct IdentityService {
	inner: Arc<ServiceInner>,
}

impl IdentityService {
	pub fn new(
		config: PhoenixConfig,
		transport: Arc<dyn HttpTransport>,
		store: Arc<dyn TokenStore>,
		sink: EventSink,
		bus: Bus,
	) -> Self {
		let auth = Endpoints::new(
			&config,
			&config.identity.auth_module,
			&config.identity.api_version,
		);
		let identity = Endpoints::new(&config, &config.identity.module, &config.identity.api_version);

		Self {
			inner: Arc::new(ServiceInner {
				config,
				auth,
				identity,
				transport,
				store,
				bus,
				sink,
				resolving: AtomicBool::new(false),
			}),
		}
	}

	pub(crate) fn bus(&self) -> &Bus {
		&self.inner.bus
	}

	pub(crate) fn queue(&self) -> &phoenix_analytics::EventQueue {
		self.inner.sink.queue()
	}

	/// Whether an authenticate or validate attempt is currently in flight
	/// for a user session.
	pub fn is_resolving(&self) -> bool {
		self.inner.resolving.load(Ordering::SeqCst)
	}

	/// Authenticates against the platform.
	///
	/// With a username this is a user login (`grant_type=password`);
	/// without one it is a client-credentials grant for the application
	/// itself. Only user logins move the resolving flag, fire analytic
	/// events and touch the token store.
	pub async fn authenticate(
		&self,
		username: Option<&str>,
		password: Option<&str>,
		remember_me: bool,
	) -> Result<AccessToken> {
		let is_client = username.is_none();
		if !is_client {
			self.set_resolving(true, None);
		}

		match self.token_grant(username, password, remember_me, is_client).await {
			Ok(token) => {
				if !is_client {
					let token_info = token.info();
					info!(expires = %token_info.expires, "user authenticated");
					self.set_resolving(false, Some(token_info.clone()));
					self.inner.bus.emit(SdkEvent::Authenticated { token: token_info });
				}
				Ok(token)
			}
			Err(err) => {
				if !is_client {
					self.inner
						.sink
						.now("Phoenix.Identity.User.AuthenticationFailed", None)
						.await;
					self.set_resolving(false, None);
				}
				Err(err)
			}
		}
	}

	/// Validates an explicit token pair against the server.
	pub async fn validate(&self, token_type: &str, access_token: &str) -> Result<AccessToken> {
		self.validate_inner(token_type, access_token, None).await
	}

	/// Validates the remembered token from the store.
	pub async fn validate_stored(&self) -> Result<AccessToken> {
		let stored = self
			.inner
			.store
			.load()
			.await?
			.ok_or(IdentityError::NoTokenFound)?;

		let token_type = stored.token_type.clone();
		let access_token = stored.access_token.clone();
		self.validate_inner(&token_type, &access_token, Some(stored)).await
	}

	/// Exchanges a refresh token for a fresh grant. The caller applies it;
	/// see [`AccessToken::refresh`].
	pub async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenResponse> {
		let url = self.inner.auth.module_url(&self.inner.config.identity.token_path);
		let fields = vec![
			("grant_type".to_string(), "refresh_token".to_string()),
			("client_id".to_string(), self.inner.config.client_id.clone()),
			(
				"client_secret".to_string(),
				self.inner.config.client_secret.clone(),
			),
			("refresh_token".to_string(), refresh_token.to_string()),
		];

		let response = self.send(ApiRequest::post_form(url, fields)).await?;
		Ok(serde_json::from_value(response.body)?)
	}

	/// Expires the remembered token. The access token presented must match
	/// the stored record exactly; on a match the record is cleared.
	pub async fn expire(&self, access_token: &str) -> Result<()> {
		let stored = self
			.inner
			.store
			.load()
			.await?
			.ok_or(IdentityError::NoTokenFound)?;

		if stored.access_token != access_token {
			return Err(IdentityError::InvalidAccessToken);
		}

		self.inner.store.clear().await?;
		Ok(())
	}

	/// The providers accessible to the token. The platform is currently a
	/// single top-level provider, so this resolves the configured one.
	pub async fn retrieve_providers(
		&self,
		token_type: &str,
		access_token: &str,
	) -> Result<Vec<Provider>> {
		let url = self
			.inner
			.identity
			.module_url(&format!("providers/{}", self.inner.config.provider_id));
		self.fetch_paged(url, token_type, access_token).await
	}

	/// The user record for the authenticated user.
	pub async fn retrieve_user(&self, token_type: &str, access_token: &str) -> Result<User> {
		let url = self.inner.identity.module_url(&format!(
			"providers/{}/users/me",
			self.inner.config.provider_id
		));
		let users: Vec<User> = self.fetch_paged(url, token_type, access_token).await?;
		users.into_iter().next().ok_or(IdentityError::MissingUser)
	}

	/// The companies accessible to the authenticated user.
	pub async fn retrieve_companies(
		&self,
		token_type: &str,
		access_token: &str,
	) -> Result<Vec<Company>> {
		let url = self.inner.identity.module_url(&format!(
			"providers/{}/companies",
			self.inner.config.provider_id
		));
		self.fetch_paged(url, token_type, access_token).await
	}

	/// The projects under one company.
	pub async fn retrieve_projects(
		&self,
		company_id: u64,
		token_type: &str,
		access_token: &str,
	) -> Result<Vec<Project>> {
		let url = self
			.inner
			.identity
			.module_url(&format!("companies/{company_id}/projects"));
		self.fetch_paged(url, token_type, access_token).await
	}

	async fn token_grant(
		&self,
		username: Option<&str>,
		password: Option<&str>,
		remember_me: bool,
		is_client: bool,
	) -> Result<AccessToken> {
		let url = self.inner.auth.module_url(&self.inner.config.identity.token_path);

		let fields = match (username, password) {
			(Some(username), Some(password)) => vec![
				("grant_type".to_string(), "password".to_string()),
				("client_id".to_string(), self.inner.config.client_id.clone()),
				(
					"client_secret".to_string(),
					self.inner.config.client_secret.clone(),
				),
				("username".to_string(), username.to_string()),
				("password".to_string(), self.wire_password(password)),
				("remember_me".to_string(), remember_me.to_string()),
			],
			_ => vec![
				("grant_type".to_string(), "client_credentials".to_string()),
				("client_id".to_string(), self.inner.config.client_id.clone()),
				(
					"client_secret".to_string(),
					self.inner.config.client_secret.clone(),
				),
			],
		};

		let mut request = ApiRequest::post_form(url, fields);
		if self.inner.config.identity.md5_hash {
			request = request.header("X-Auth-Intelligence", "V2");
		}

		let response = self.send(request).await?;
		let grant: TokenResponse = serde_json::from_value(response.body)?;
		let token = AccessToken::from_response(&grant, self.clone(), !is_client);

		if !is_client {
			token
				.event("Phoenix.Identity.User.Authenticated", None, None)
				.await?;

			if remember_me {
				self.persist(&grant, &token).await;
			}
		}

		Ok(token)
	}

	async fn validate_inner(
		&self,
		token_type: &str,
		access_token: &str,
		stored: Option<StoredToken>,
	) -> Result<AccessToken> {
		self.set_resolving(true, None);

		let url = self
			.inner
			.auth
			.module_url(&self.inner.config.identity.validate_path);
		let request = ApiRequest::get(url)
			.authorization(token_type, access_token)
			.header("Accept", "application/json");

		let outcome = match self.send(request).await {
			Ok(response) => serde_json::from_value::<TokenResponse>(response.body).map_err(Into::into),
			Err(err) => Err(err),
		};

		match outcome {
			Ok(grant) => {
				let token = AccessToken::from_response(&grant, self.clone(), true);
				token
					.event("Phoenix.Identity.Application.Opened", None, None)
					.await?;
				self.persist(&grant, &token).await;

				let token_info = token.info();
				self.set_resolving(false, Some(token_info.clone()));
				self.inner.bus.emit(SdkEvent::Validated { token: token_info });
				Ok(token)
			}
			Err(err) => {
				// The expired-token event carries the record that failed so
				// observers can tell which session went stale.
				let metadata = stored.as_ref().and_then(|record| {
					match serde_json::to_value(record) {
						Ok(Value::Object(map)) => Some(map),
						_ => None,
					}
				});
				self.inner
					.sink
					.now("Phoenix.Identity.Token.Expired", metadata)
					.await;
				self.set_resolving(false, None);
				Err(err)
			}
		}
	}

	async fn persist(&self, grant: &TokenResponse, token: &AccessToken) {
		let record = StoredToken {
			access_token: grant.access_token.clone(),
			token_type: grant.token_type.clone(),
			expiry: token.expires(),
			created: token.created(),
		};
		if let Err(err) = self.inner.store.save(&record).await {
			warn!(error = %err, "failed to persist token record");
		}
	}

	fn wire_password(&self, password: &str) -> String {
		if self.inner.config.identity.md5_hash {
			hex::encode_upper(Md5::digest(password.as_bytes()))
		} else {
			password.to_string()
		}
	}

	fn set_resolving(&self, resolving: bool, token: Option<TokenInfo>) {
		if self.inner.resolving.swap(resolving, Ordering::SeqCst) != resolving {
			if resolving {
				self.inner.bus.emit(SdkEvent::Resolving);
			} else {
				self.inner.bus.emit(SdkEvent::Resolved { token });
			}
		}
	}

	async fn fetch_paged<T: DeserializeOwned>(
		&self,
		url: String,
		token_type: &str,
		access_token: &str,
	) -> Result<Vec<T>> {
		let request = ApiRequest::get(url)
			.authorization(token_type, access_token)
			.header("Accept", "application/json");
		let response = self.send(request).await?;
		let page: PagedResponse<T> = serde_json::from_value(response.body)?;
		Ok(page.data)
	}

	async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let response = self.inner.transport.request(request).await?;
		if response.success {
			Ok(response)
		} else {
			debug!(status = response.status, "identity request rejected");
			Err(IdentityError::Server {
				status: response.status,
				body: response.body,
			})
		}
	}
}
