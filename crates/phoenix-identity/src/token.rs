// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The access token handle.
//!
//! Tokens are only created through [`IdentityService`] grants. A user token
//! additionally kicks off background fetches of the account it represents
//! (providers, user record, companies, projects), each announced on the bus
//! as it arrives. Secrets live behind the handle and never leave it except
//! inside Authorization headers.

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use chrono::{DateTime, Duration, Utc};
use phoenix_analytics::{Event, EventCredentials};
use phoenix_core::{Company, Project, Provider, SdkEvent, SdkEventKind, TokenInfo, User};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{IdentityError, Result};
use crate::service::{IdentityService, TokenResponse};

#[derive(Default)]
struct Secrets {
	access_token: Option<String>,
	refresh_token: Option<String>,
}

struct TokenState {
	token_type: String,
	expires: DateTime<Utc>,
	created: DateTime<Utc>,
}

#[derive(Default)]
struct Account {
	providers: Option<Vec<Provider>>,
	user: Option<User>,
	companies: Option<Vec<Company>>,
	projects: Option<Vec<Project>>,
}

struct TokenInner {
	service: IdentityService,
	is_user_token: bool,
	secrets: RwLock<Secrets>,
	state: RwLock<TokenState>,
	account: RwLock<Account>,
}

/// An access token granting the holder access to the platform.
#[derive(Clone)]
pub struct AccessToken {
	inner: Arc<TokenInner>,
}

// Hand-written so the secrets can never leak through formatting.
impl fmt::Debug for AccessToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state();
		f.debug_struct("AccessToken")
			.field("token_type", &state.token_type)
			.field("expires", &state.expires)
			.field("created", &state.created)
			.field("is_user_token", &self.inner.is_user_token)
			.finish_non_exhaustive()
	}
}

impl AccessToken {
	pub(crate) fn from_response(
		grant: &TokenResponse,
		service: IdentityService,
		is_user_token: bool,
	) -> Self {
		let now = Utc::now();
		let token = Self {
			inner: Arc::new(TokenInner {
				service,
				is_user_token,
				secrets: RwLock::new(Secrets {
					access_token: Some(grant.access_token.clone()),
					refresh_token: grant.refresh_token.clone(),
				}),
				state: RwLock::new(TokenState {
					token_type: normalize_token_type(&grant.token_type),
					expires: now + Duration::milliseconds(grant.expires_in),
					created: now,
				}),
				account: RwLock::new(Account::default()),
			}),
		};

		if is_user_token {
			token.spawn_account_fetches();
		}
		token.register_geolocation_listener();
		token
	}

	/// Normalized token type, e.g. `Bearer`.
	pub fn token_type(&self) -> String {
		self.state().token_type.clone()
	}

	/// When the token expires.
	pub fn expires(&self) -> DateTime<Utc> {
		self.state().expires
	}

	/// When the token was created.
	pub fn created(&self) -> DateTime<Utc> {
		self.state().created
	}

	/// Whether this token represents an end user rather than the client
	/// application.
	pub fn is_user_token(&self) -> bool {
		self.inner.is_user_token
	}

	/// A non-secret snapshot suitable for bus payloads.
	pub fn info(&self) -> TokenInfo {
		let state = self.state();
		TokenInfo {
			token_type: state.token_type.clone(),
			expires: state.expires,
			created: state.created,
			is_user_token: self.inner.is_user_token,
		}
	}

	/// Creates an analytical event attributed to this token's session.
	/// Returns the event and the queue length after the append.
	pub async fn event(
		&self,
		name: &str,
		metadata: Option<Map<String, Value>>,
		date: Option<DateTime<Utc>>,
	) -> Result<(Event, usize)> {
		let credentials = self.credentials()?;
		Ok(self
			.inner
			.service
			.queue()
			.event(credentials, name, metadata, date)
			.await)
	}

	/// Creates a real-time event attributed to this token's session and
	/// forces the queue out.
	pub async fn now(
		&self,
		name: &str,
		metadata: Option<Map<String, Value>>,
		date: Option<DateTime<Utc>>,
	) -> Result<Event> {
		let credentials = self.credentials()?;
		Ok(self
			.inner
			.service
			.queue()
			.now(credentials, name, metadata, date)
			.await)
	}

	/// Number of events waiting in the shared queue.
	pub async fn event_count(&self) -> usize {
		self.inner.service.queue().event_count().await
	}

	/// Refreshes this token in place, extending its expiry. On failure the
	/// token is left untouched.
	pub async fn refresh(&self) -> Result<()> {
		let refresh_token = self
			.secrets()
			.refresh_token
			.clone()
			.ok_or(IdentityError::TokenExpired)?;

		let grant = self.inner.service.refresh_grant(&refresh_token).await?;
		self.apply_grant(&grant);
		self.inner
			.service
			.bus()
			.emit(SdkEvent::Refreshed { token: self.info() });
		Ok(())
	}

	/// Validates this token against the server and syncs the local expiry
	/// with the server's. Returns the fresh token the server issued.
	pub async fn validate(&self) -> Result<AccessToken> {
		let credentials = self.credentials()?;
		let fresh = self
			.inner
			.service
			.validate(&credentials.token_type, &credentials.access_token)
			.await?;

		{
			let mut state = self.inner.state.write().expect("token state lock poisoned");
			state.expires = fresh.expires();
		}
		Ok(fresh)
	}

	/// Expires this token: clears the remembered record, wipes the secrets
	/// held in memory and announces the expiry.
	pub async fn expire(&self) -> Result<()> {
		let credentials = self.credentials()?;
		self.inner.service.expire(&credentials.access_token).await?;

		{
			let mut secrets = self.inner.secrets.write().expect("token secret lock poisoned");
			*secrets = Secrets::default();
		}
		{
			let mut state = self.inner.state.write().expect("token state lock poisoned");
			state.expires = Utc::now();
		}

		self.inner.service.bus().emit(SdkEvent::Expired);
		Ok(())
	}

	/// Providers available to this token once the background fetch lands.
	pub fn providers(&self) -> Option<Vec<Provider>> {
		self.account().providers.clone()
	}

	/// The authenticated user once the background fetch lands.
	pub fn user(&self) -> Option<User> {
		self.account().user.clone()
	}

	/// Companies available to this token once the background fetch lands.
	pub fn companies(&self) -> Option<Vec<Company>> {
		self.account().companies.clone()
	}

	/// The aggregate project list. Present only after every company's
	/// project fetch has resolved.
	pub fn projects(&self) -> Option<Vec<Project>> {
		self.account().projects.clone()
	}

	/// The credential pair events fired through this token carry. Fails
	/// once the token has been expired.
	pub fn credentials(&self) -> Result<EventCredentials> {
		let access_token = self
			.secrets()
			.access_token
			.clone()
			.ok_or(IdentityError::TokenExpired)?;
		Ok(EventCredentials {
			token_type: self.state().token_type.clone(),
			access_token,
		})
	}

	fn apply_grant(&self, grant: &TokenResponse) {
		let now = Utc::now();
		{
			let mut secrets = self.inner.secrets.write().expect("token secret lock poisoned");
			secrets.access_token = Some(grant.access_token.clone());
			if grant.refresh_token.is_some() {
				secrets.refresh_token = grant.refresh_token.clone();
			}
		}
		{
			let mut state = self.inner.state.write().expect("token state lock poisoned");
			state.token_type = normalize_token_type(&grant.token_type);
			state.expires = now + Duration::milliseconds(grant.expires_in);
			state.created = now;
		}

		if self.inner.is_user_token {
			self.spawn_account_fetches();
		}
	}

	/// Kicks off the independent account fetches. Companies gate projects:
	/// the aggregate project list is published only once every company's
	/// fetch has resolved, and companies with no projects still count.
	fn spawn_account_fetches(&self) {
		let Ok(credentials) = self.credentials() else {
			return;
		};

		{
			let token = self.clone();
			let credentials = credentials.clone();
			tokio::spawn(async move {
				match token
					.inner
					.service
					.retrieve_providers(&credentials.token_type, &credentials.access_token)
					.await
				{
					Ok(providers) => {
						token
							.inner
							.account
							.write()
							.expect("account lock poisoned")
							.providers = Some(providers.clone());
						token
							.inner
							.service
							.bus()
							.emit(SdkEvent::UpdatedProviders { providers });
					}
					Err(err) => debug!(error = %err, "provider lookup failed"),
				}
			});
		}

		{
			let token = self.clone();
			let credentials = credentials.clone();
			tokio::spawn(async move {
				match token
					.inner
					.service
					.retrieve_user(&credentials.token_type, &credentials.access_token)
					.await
				{
					Ok(user) => {
						token.inner.account.write().expect("account lock poisoned").user = Some(user.clone());
						token.inner.service.bus().emit(SdkEvent::UpdatedUser { user });
					}
					Err(err) => debug!(error = %err, "user lookup failed"),
				}
			});
		}

		{
			let token = self.clone();
			tokio::spawn(async move {
				let service = token.inner.service.clone();
				let companies = match service
					.retrieve_companies(&credentials.token_type, &credentials.access_token)
					.await
				{
					Ok(companies) => companies,
					Err(err) => {
						debug!(error = %err, "company lookup failed");
						return;
					}
				};

				token
					.inner
					.account
					.write()
					.expect("account lock poisoned")
					.companies = Some(companies.clone());
				service.bus().emit(SdkEvent::UpdatedCompanies {
					companies: companies.clone(),
				});

				let fetches = companies.iter().map(|company| {
					let service = service.clone();
					let credentials = credentials.clone();
					let company_id = company.id;
					async move {
						service
							.retrieve_projects(company_id, &credentials.token_type, &credentials.access_token)
							.await
					}
				});

				let mut projects = Vec::new();
				for result in futures::future::join_all(fetches).await {
					match result {
						Ok(batch) => projects.extend(batch),
						Err(err) => debug!(error = %err, "project lookup failed"),
					}
				}

				token
					.inner
					.account
					.write()
					.expect("account lock poisoned")
					.projects = Some(projects.clone());
				service.bus().emit(SdkEvent::UpdatedProjects { projects });
			});
		}
	}

	/// A denied geolocation request is reported as a real-time analytic
	/// event on whichever token is live. The listener holds a weak handle
	/// so it cannot keep a dropped token alive.
	fn register_geolocation_listener(&self) {
		let weak: Weak<TokenInner> = Arc::downgrade(&self.inner);
		self.inner
			.service
			.bus()
			.on(SdkEventKind::GeolocationPermissionDenied, move |_| {
				let Some(inner) = weak.upgrade() else {
					return;
				};
				let token = AccessToken { inner };
				tokio::spawn(async move {
					if let Err(err) = token
						.now("Intelligence.Geolocation.Permission.Denied", None, None)
						.await
					{
						debug!(error = %err, "could not report geolocation denial");
					}
				});
			});
	}

	fn secrets(&self) -> std::sync::RwLockReadGuard<'_, Secrets> {
		self.inner.secrets.read().expect("token secret lock poisoned")
	}

	fn state(&self) -> std::sync::RwLockReadGuard<'_, TokenState> {
		self.inner.state.read().expect("token state lock poisoned")
	}

	fn account(&self) -> std::sync::RwLockReadGuard<'_, Account> {
		self.inner.account.read().expect("account lock poisoned")
	}
}

/// The platform is inconsistent about token-type casing; normalize the
/// first letter so `bearer` and `Bearer` produce identical headers.
fn normalize_token_type(token_type: &str) -> String {
	let mut chars = token_type.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => String::new(),
	}
}
