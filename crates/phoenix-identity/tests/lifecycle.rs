// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end identity lifecycle tests against an in-process mock of the
//! platform API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use md5::{Digest, Md5};
use phoenix_analytics::{DeviceContext, EventCredentials, EventQueue, EventSink};
use phoenix_bus::HandlerId;
use phoenix_core::{Bus, PhoenixConfig, SdkEvent, SdkEventKind, StoredToken};
use phoenix_http::{ApiRequest, ApiResponse, HttpTransport, RequestBody, TransportError};
use phoenix_identity::{IdentityError, IdentityService, MemoryTokenStore, TokenStore};
use serde_json::json;

struct MockApi {
	requests: Mutex<Vec<ApiRequest>>,
	fail_token: AtomicBool,
	fail_validate: AtomicBool,
	empty_companies: AtomicBool,
}

impl MockApi {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			requests: Mutex::new(Vec::new()),
			fail_token: AtomicBool::new(false),
			fail_validate: AtomicBool::new(false),
			empty_companies: AtomicBool::new(false),
		})
	}

	fn recorded(&self) -> Vec<ApiRequest> {
		self.requests.lock().unwrap().clone()
	}

	fn form_field(request: &ApiRequest, name: &str) -> Option<String> {
		match &request.body {
			Some(RequestBody::Form(fields)) => fields
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	fn header(request: &ApiRequest, name: &str) -> Option<String> {
		request
			.headers
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.clone())
	}

	fn json_body(request: &ApiRequest) -> String {
		match &request.body {
			Some(RequestBody::Json(value)) => value.to_string(),
			other => panic!("expected JSON body, got {other:?}"),
		}
	}

	fn ok(body: serde_json::Value) -> ApiResponse {
		ApiResponse {
			status: 200,
			success: true,
			headers: HashMap::new(),
			body,
		}
	}

	fn rejected(status: u16, body: serde_json::Value) -> ApiResponse {
		ApiResponse {
			status,
			success: false,
			headers: HashMap::new(),
			body,
		}
	}

	fn company(id: u64) -> serde_json::Value {
		json!({
			"Id": id,
			"ProviderId": 300,
			"Name": format!("Company {id}"),
			"DateCreated": "2024-01-01T00:00:00Z",
			"DateUpdated": "2024-01-02T00:00:00Z"
		})
	}

	fn project(id: u64, company_id: u64) -> serde_json::Value {
		json!({
			"Id": id,
			"CompanyId": company_id,
			"Name": format!("Project {id}"),
			"DateCreated": "2024-01-01T00:00:00Z",
			"DateUpdated": "2024-01-02T00:00:00Z"
		})
	}
}

#[async_trait]
impl HttpTransport for MockApi {
	async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
		self.requests.lock().unwrap().push(request.clone());
		let url = request.url.as_str();

		if url.contains("/token") {
			if self.fail_token.load(Ordering::SeqCst) {
				return Ok(Self::rejected(400, json!({"error": "invalid_grant"})));
			}
			let grant_type = Self::form_field(&request, "grant_type").unwrap_or_default();
			let body = match grant_type.as_str() {
				"client_credentials" => json!({
					"access_token": "client-access",
					"token_type": "bearer",
					"expires_in": 7_200_000u64
				}),
				"refresh_token" => json!({
					"access_token": "user-access-2",
					"token_type": "bearer",
					"expires_in": 7_200_000u64,
					"refresh_token": "refresh-2"
				}),
				_ => json!({
					"access_token": "user-access",
					"token_type": "bearer",
					"expires_in": 7_200_000u64,
					"refresh_token": "refresh-1"
				}),
			};
			return Ok(Self::ok(body));
		}

		if url.contains("/validate") {
			if self.fail_validate.load(Ordering::SeqCst) {
				return Ok(Self::rejected(401, json!({"error": "invalid_token"})));
			}
			return Ok(Self::ok(json!({
				"access_token": "validated-access",
				"token_type": "bearer",
				"expires_in": 3_600_000u64
			})));
		}

		if url.contains("/users/me") {
			return Ok(Self::ok(json!({
				"Data": [{
					"Id": 42,
					"CompanyId": 7,
					"Username": "jane@example.com",
					"FirstName": "Jane",
					"LastName": "Doe",
					"DateCreated": "2024-01-01T00:00:00Z",
					"DateUpdated": "2024-01-02T00:00:00Z"
				}]
			})));
		}

		if url.contains("/companies") && url.contains("providers/") {
			let companies = if self.empty_companies.load(Ordering::SeqCst) {
				json!([])
			} else {
				json!([Self::company(7), Self::company(8)])
			};
			return Ok(Self::ok(json!({ "Data": companies })));
		}

		if url.contains("companies/7/projects") {
			return Ok(Self::ok(json!({
				"Data": [Self::project(70, 7), Self::project(71, 7)]
			})));
		}

		if url.contains("companies/8/projects") {
			return Ok(Self::ok(json!({ "Data": [] })));
		}

		if url.contains("providers/300") {
			return Ok(Self::ok(json!({
				"Data": [{
					"Id": 300,
					"Name": "Phoenix",
					"DateCreated": "2024-01-01T00:00:00Z",
					"DateUpdated": "2024-01-02T00:00:00Z"
				}]
			})));
		}

		if url.contains("/events") {
			return Ok(Self::ok(json!({})));
		}

		panic!("unexpected request to {url}");
	}
}

struct Harness {
	service: IdentityService,
	bus: Bus,
	sink: EventSink,
	store: Arc<MemoryTokenStore>,
	api: Arc<MockApi>,
	queue: EventQueue,
}

fn harness() -> Harness {
	let api = MockApi::new();
	let config = PhoenixConfig::builder()
		.client_id("client-1")
		.client_secret("secret-1")
		.project_id("2000")
		.application_id("9000")
		.build()
		.unwrap();
	let bus = Bus::new();
	let queue = EventQueue::new(
		&config,
		Arc::clone(&api) as Arc<dyn HttpTransport>,
		bus.clone(),
		DeviceContext::host(),
	);
	let sink = EventSink::new(queue.clone());
	let store = Arc::new(MemoryTokenStore::new());
	let service = IdentityService::new(
		config,
		Arc::clone(&api) as Arc<dyn HttpTransport>,
		Arc::clone(&store) as Arc<dyn TokenStore>,
		sink.clone(),
		bus.clone(),
	);

	Harness {
		service,
		bus,
		sink,
		store,
		api,
		queue,
	}
}

fn capture(bus: &Bus, kind: SdkEventKind) -> (Arc<Mutex<Vec<SdkEvent>>>, HandlerId) {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	let id = bus.on(kind, move |event| {
		sink.lock().unwrap().push(event);
	});
	(seen, id)
}

async fn settle() {
	tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn client_credentials_grant_builds_a_client_token() {
	let h = harness();

	let token = h.service.authenticate(None, None, false).await.unwrap();

	assert!(!token.is_user_token());
	assert_eq!(token.token_type(), "Bearer");
	assert!(token.expires() > Utc::now());

	let requests = h.api.recorded();
	assert_eq!(requests.len(), 1);
	assert_eq!(
		MockApi::form_field(&requests[0], "grant_type").as_deref(),
		Some("client_credentials")
	);
	assert_eq!(
		MockApi::form_field(&requests[0], "client_id").as_deref(),
		Some("client-1")
	);
	// Client logins fire no analytic events and never touch the store.
	assert_eq!(h.queue.event_count().await, 0);
	assert!(h.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn password_grant_hashes_the_password_and_flags_the_request() {
	let h = harness();

	let token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();
	assert!(token.is_user_token());

	let requests = h.api.recorded();
	let grant = &requests[0];
	assert_eq!(
		MockApi::form_field(grant, "grant_type").as_deref(),
		Some("password")
	);
	assert_eq!(
		MockApi::form_field(grant, "password"),
		Some(hex::encode_upper(Md5::digest(b"hunter2")))
	);
	assert_eq!(
		MockApi::header(grant, "X-Auth-Intelligence").as_deref(),
		Some("V2")
	);

	// The login enqueues an analytical authenticated event.
	assert_eq!(h.queue.event_count().await, 1);
}

#[tokio::test]
async fn disabling_md5_sends_the_password_in_clear() {
	let api = MockApi::new();
	let config = PhoenixConfig::builder()
		.client_id("client-1")
		.client_secret("secret-1")
		.project_id("2000")
		.md5_hash(false)
		.build()
		.unwrap();

	let bus = Bus::new();
	let queue = EventQueue::new(
		&config,
		Arc::clone(&api) as Arc<dyn HttpTransport>,
		bus.clone(),
		DeviceContext::host(),
	);
	let service = IdentityService::new(
		config,
		Arc::clone(&api) as Arc<dyn HttpTransport>,
		Arc::new(MemoryTokenStore::new()),
		EventSink::new(queue),
		bus,
	);

	service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();

	let requests = api.recorded();
	assert_eq!(
		MockApi::form_field(&requests[0], "password").as_deref(),
		Some("hunter2")
	);
	assert!(MockApi::header(&requests[0], "X-Auth-Intelligence").is_none());
}

#[tokio::test]
async fn user_login_moves_the_resolving_flag_and_announces_itself() {
	let h = harness();
	let (resolving, _) = capture(&h.bus, SdkEventKind::Resolving);
	let (resolved, _) = capture(&h.bus, SdkEventKind::Resolved);
	let (authenticated, _) = capture(&h.bus, SdkEventKind::Authenticated);

	assert!(!h.service.is_resolving());
	h.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();
	assert!(!h.service.is_resolving());

	settle().await;
	assert_eq!(resolving.lock().unwrap().len(), 1);
	assert_eq!(resolved.lock().unwrap().len(), 1);
	assert_eq!(authenticated.lock().unwrap().len(), 1);
	let resolved = resolved.lock().unwrap();
	match &resolved[0] {
		SdkEvent::Resolved { token: Some(info) } => assert!(info.is_user_token),
		other => panic!("unexpected resolved payload: {other:?}"),
	}
}

#[tokio::test]
async fn failed_login_surfaces_the_server_error_and_fires_the_failure_event() {
	let h = harness();
	h.api.fail_token.store(true, Ordering::SeqCst);
	// Simulate an already-connected client so failure events hit the wire.
	h.sink
		.set_credentials(EventCredentials {
			token_type: "Bearer".to_string(),
			access_token: "client-access".to_string(),
		})
		.await;

	let err = h
		.service
		.authenticate(Some("jane@example.com"), Some("wrong"), false)
		.await
		.unwrap_err();
	match err {
		IdentityError::Server { status, .. } => assert_eq!(status, 400),
		other => panic!("unexpected error: {other}"),
	}
	assert!(!h.service.is_resolving());

	settle().await;
	let events_request = h
		.api
		.recorded()
		.into_iter()
		.find(|request| request.url.contains("/events"))
		.expect("no event batch was sent");
	let raw = MockApi::json_body(&events_request);
	assert!(raw.contains("Phoenix.Identity.User.AuthenticationFailed"));
}

#[tokio::test]
async fn remember_me_round_trips_through_the_store() {
	let h = harness();

	let token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), true)
		.await
		.unwrap();

	let stored = h.store.load().await.unwrap().expect("nothing persisted");
	assert_eq!(stored.access_token, "user-access");
	assert_eq!(stored.token_type, "bearer");
	assert_eq!(stored.expiry, token.expires());

	let (validated, _) = capture(&h.bus, SdkEventKind::Validated);
	let revalidated = h.service.validate_stored().await.unwrap();
	assert_eq!(revalidated.token_type(), "Bearer");
	assert!(revalidated.is_user_token());

	// The validate request carried the remembered pair.
	let validate_request = h
		.api
		.recorded()
		.into_iter()
		.find(|request| request.url.contains("/validate"))
		.expect("no validate request");
	assert_eq!(
		MockApi::header(&validate_request, "Authorization").as_deref(),
		Some("bearer user-access")
	);

	settle().await;
	assert_eq!(validated.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn validate_stored_without_a_record_is_no_token_found() {
	let h = harness();

	match h.service.validate_stored().await.unwrap_err() {
		IdentityError::NoTokenFound => {}
		other => panic!("unexpected error: {other}"),
	}
	// No network traffic for a missing record.
	assert!(h.api.recorded().is_empty());
}

#[tokio::test]
async fn failed_validation_fires_token_expired_with_the_stale_record() {
	let h = harness();
	h.api.fail_validate.store(true, Ordering::SeqCst);
	h.sink
		.set_credentials(EventCredentials {
			token_type: "Bearer".to_string(),
			access_token: "client-access".to_string(),
		})
		.await;
	h.store
		.save(&StoredToken {
			access_token: "stale-access".to_string(),
			token_type: "Bearer".to_string(),
			expiry: Utc::now(),
			created: Utc::now(),
		})
		.await
		.unwrap();

	match h.service.validate_stored().await.unwrap_err() {
		IdentityError::Server { status, .. } => assert_eq!(status, 401),
		other => panic!("unexpected error: {other}"),
	}

	settle().await;
	let events_request = h
		.api
		.recorded()
		.into_iter()
		.find(|request| request.url.contains("/events"))
		.expect("no event batch was sent");
	let raw = MockApi::json_body(&events_request);
	assert!(raw.contains("Phoenix.Identity.Token.Expired"));
	// The stale record rides along as metadata.
	assert!(raw.contains("stale-access"));
}

#[tokio::test]
async fn expire_clears_the_record_and_then_validate_stored_finds_nothing() {
	let h = harness();

	h.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), true)
		.await
		.unwrap();
	assert!(h.store.load().await.unwrap().is_some());

	h.service.expire("user-access").await.unwrap();
	assert!(h.store.load().await.unwrap().is_none());

	match h.service.validate_stored().await.unwrap_err() {
		IdentityError::NoTokenFound => {}
		other => panic!("unexpected error: {other}"),
	}
}

#[tokio::test]
async fn expire_with_the_wrong_token_is_rejected() {
	let h = harness();
	h.store
		.save(&StoredToken {
			access_token: "the-real-one".to_string(),
			token_type: "Bearer".to_string(),
			expiry: Utc::now(),
			created: Utc::now(),
		})
		.await
		.unwrap();

	match h.service.expire("an-impostor").await.unwrap_err() {
		IdentityError::InvalidAccessToken => {}
		other => panic!("unexpected error: {other}"),
	}
	assert!(h.store.load().await.unwrap().is_some());
}

#[tokio::test]
async fn token_expire_wipes_secrets_and_announces() {
	let h = harness();
	let (expired, _) = capture(&h.bus, SdkEventKind::Expired);

	let token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), true)
		.await
		.unwrap();

	token.expire().await.unwrap();
	assert!(token.expires() <= Utc::now());

	// The secrets are gone, so the token can no longer fire events.
	match token.event("anything", None, None).await.unwrap_err() {
		IdentityError::TokenExpired => {}
		other => panic!("unexpected error: {other}"),
	}

	settle().await;
	assert_eq!(expired.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn refresh_extends_the_token_in_place() {
	let h = harness();
	let (refreshed, _) = capture(&h.bus, SdkEventKind::Refreshed);

	let token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();
	let first_expiry = token.expires();

	tokio::time::sleep(Duration::from_millis(20)).await;
	token.refresh().await.unwrap();
	assert!(token.expires() > first_expiry);

	let refresh_request = h
		.api
		.recorded()
		.into_iter()
		.find(|request| {
			MockApi::form_field(request, "grant_type").as_deref() == Some("refresh_token")
		})
		.expect("no refresh grant request");
	assert_eq!(
		MockApi::form_field(&refresh_request, "refresh_token").as_deref(),
		Some("refresh-1")
	);

	settle().await;
	assert_eq!(refreshed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn user_login_fans_out_account_fetches_and_announces_each() {
	let h = harness();
	let (providers, _) = capture(&h.bus, SdkEventKind::UpdatedProviders);
	let (users, _) = capture(&h.bus, SdkEventKind::UpdatedUser);
	let (companies, _) = capture(&h.bus, SdkEventKind::UpdatedCompanies);
	let (projects, _) = capture(&h.bus, SdkEventKind::UpdatedProjects);

	let token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();

	settle().await;

	assert_eq!(providers.lock().unwrap().len(), 1);
	assert_eq!(users.lock().unwrap().len(), 1);
	assert_eq!(companies.lock().unwrap().len(), 1);
	assert_eq!(projects.lock().unwrap().len(), 1);

	match &projects.lock().unwrap()[0] {
		SdkEvent::UpdatedProjects { projects } => {
			// Two projects under company 7, none under company 8.
			assert_eq!(projects.len(), 2);
		}
		other => panic!("unexpected payload: {other:?}"),
	}

	assert_eq!(token.providers().map(|p| p.len()), Some(1));
	assert_eq!(token.user().map(|u| u.id), Some(42));
	assert_eq!(token.companies().map(|c| c.len()), Some(2));
	assert_eq!(token.projects().map(|p| p.len()), Some(2));
}

#[tokio::test]
async fn a_user_with_no_companies_still_gets_a_project_list() {
	let h = harness();
	h.api.empty_companies.store(true, Ordering::SeqCst);
	let (projects, _) = capture(&h.bus, SdkEventKind::UpdatedProjects);

	let token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();

	settle().await;

	match &projects.lock().unwrap()[0] {
		SdkEvent::UpdatedProjects { projects } => assert!(projects.is_empty()),
		other => panic!("unexpected payload: {other:?}"),
	}
	assert_eq!(token.projects().map(|p| p.len()), Some(0));
}

#[tokio::test]
async fn debug_output_never_contains_the_secrets() {
	let h = harness();

	let token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();

	let shown = format!("{token:?}");
	assert!(shown.contains("AccessToken"));
	assert!(shown.contains("is_user_token"));
	assert!(!shown.contains("user-access"));
	assert!(!shown.contains("refresh-1"));
}

#[tokio::test]
async fn geolocation_denial_becomes_an_analytic_event_on_the_live_token() {
	let h = harness();

	let _token = h
		.service
		.authenticate(Some("jane@example.com"), Some("hunter2"), false)
		.await
		.unwrap();

	h.bus.emit(SdkEvent::GeolocationPermissionDenied);
	settle().await;

	let events_request = h
		.api
		.recorded()
		.into_iter()
		.find(|request| request.url.contains("/events"))
		.expect("no event batch was sent");
	let raw = MockApi::json_body(&events_request);
	assert!(raw.contains("Intelligence.Geolocation.Permission.Denied"));
}
