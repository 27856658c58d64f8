// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event queue and batch flusher.
//!
//! Events append to the tail; flushes drain bounded batches from the head,
//! so insertion order is preserved within and across batches. At most one
//! flush is in flight at a time: a flush issued while another is running
//! returns without touching the queue or the transport. New events may
//! still append while a flush is outstanding; they become eligible for the
//! next cycle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use phoenix_core::{
	AnalyticsConfig, Bus, Endpoints, FlushRetryMode, PhoenixConfig, SdkEvent, SdkEventKind,
};
use phoenix_http::{ApiRequest, HttpTransport, RetryConfig};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::context::{DeviceContext, EventContext};
use crate::error::AnalyticsError;
use crate::event::{Event, EventCredentials};
use crate::geo::{GeoError, GeolocationProvider, IpResolver};

struct QueueInner {
	analytics: AnalyticsConfig,
	retry: RetryConfig,
	events_url: String,
	bus: Bus,
	context: Arc<EventContext>,
	transport: Arc<dyn HttpTransport>,
	queue: Mutex<VecDeque<Event>>,
	flushing: AtomicBool,
	timer_started: AtomicBool,
}

/// The analytics event queue.
///
/// One queue exists per SDK instance; every authenticated context within
/// that instance shares it, so a flush triggered anywhere drains events
/// enqueued everywhere.
#[derive(Clone)]
pub struct EventQueue {
	inner: Arc<QueueInner>,
}

impl EventQueue {
	/// Creates an empty queue.
	pub fn new(
		config: &PhoenixConfig,
		transport: Arc<dyn HttpTransport>,
		bus: Bus,
		device: DeviceContext,
	) -> Self {
		let endpoints = Endpoints::new(config, &config.analytics.module, &config.analytics.api_version);
		let events_url = endpoints.module_url(&format!("projects/{}/events", config.project_id));
		let context = Arc::new(EventContext::new(config, device));

		// Subsequent events are attributed to the user once identity
		// resolves who that is.
		let context_for_bus = Arc::clone(&context);
		bus.on(SdkEventKind::UpdatedUser, move |event| {
			if let SdkEvent::UpdatedUser { user } = event {
				context_for_bus.set_user_id(user.id.to_string());
			}
		});

		Self {
			inner: Arc::new(QueueInner {
				analytics: config.analytics.clone(),
				retry: RetryConfig::default(),
				events_url,
				bus,
				context,
				transport,
				queue: Mutex::new(VecDeque::new()),
				flushing: AtomicBool::new(false),
				timer_started: AtomicBool::new(false),
			}),
		}
	}

	/// Overrides the backoff used by [`FlushRetryMode::Requeue`].
	pub fn with_retry(mut self, retry: RetryConfig) -> Self {
		// Queues are cloned handles; reconfiguring is only supported before
		// the first clone escapes.
		if let Some(inner) = Arc::get_mut(&mut self.inner) {
			inner.retry = retry;
		}
		self
	}

	/// The stamping context shared with background tasks.
	pub fn context(&self) -> Arc<EventContext> {
		Arc::clone(&self.inner.context)
	}

	/// Creates an analytical event and appends it to the queue.
	///
	/// Returns the event and the queue length after the append.
	pub async fn event(
		&self,
		credentials: EventCredentials,
		name: &str,
		metadata: Option<Map<String, Value>>,
		date: Option<chrono::DateTime<chrono::Utc>>,
	) -> (Event, usize) {
		let event = self.inner.context.build_event(credentials, name, metadata, date);
		let length = {
			let mut queue = self.inner.queue.lock().await;
			queue.push_back(event.clone());
			queue.len()
		};
		debug!(event_type = %event.event_type, queue_len = length, "event enqueued");
		(event, length)
	}

	/// Creates a real-time event: appends it and forces the queue out.
	///
	/// Resolves once the flush round trip has completed, or immediately if
	/// another flush was already in flight (the event then rides the next
	/// cycle).
	pub async fn now(
		&self,
		credentials: EventCredentials,
		name: &str,
		metadata: Option<Map<String, Value>>,
		date: Option<chrono::DateTime<chrono::Utc>>,
	) -> Event {
		let (event, _) = self.event(credentials, name, metadata, date).await;
		self.flush().await;
		event
	}

	/// Number of events waiting to be sent.
	pub async fn event_count(&self) -> usize {
		self.inner.queue.lock().await.len()
	}

	/// Sends queued events to the server in bounded batches.
	///
	/// Returns the number of events removed from the queue by this call;
	/// zero when the queue was empty or a flush was already in flight.
	pub async fn flush(&self) -> usize {
		self.ensure_timer();

		if self.inner.flushing.swap(true, Ordering::SeqCst) {
			debug!("flush already in flight; skipping");
			return 0;
		}

		let removed = self.drain_and_send().await;
		self.inner.flushing.store(false, Ordering::SeqCst);
		removed
	}

	/// Initialises the queue: one public IP lookup (refreshed periodically
	/// thereafter) and one immediate flush attempt.
	pub async fn init(&self, resolver: Option<Arc<dyn IpResolver>>) {
		if let Some(resolver) = resolver {
			let queue = self.clone();
			let interval = self.inner.analytics.ip_refresh_interval;
			tokio::spawn(async move {
				loop {
					match resolver.public_ip().await {
						Ok(ip) => {
							queue.inner.context.set_ip_address(ip);
						}
						Err(err) => {
							warn!(error = %err, "public IP lookup failed");
							break;
						}
					}
					tokio::time::sleep(interval).await;
				}
			});
		}

		self.flush().await;
	}

	/// Starts the geolocation refresh loop, if geolocation is enabled.
	///
	/// A permission denial stops the loop for good and is surfaced on the
	/// bus; transient failures retry on the refresh interval.
	pub fn start_geolocation(&self, provider: Arc<dyn GeolocationProvider>) {
		if !self.inner.analytics.use_geolocation {
			return;
		}

		let queue = self.clone();
		let interval = self.inner.analytics.location_refresh_interval;
		tokio::spawn(async move {
			loop {
				match provider.current_position().await {
					Ok(position) => {
						queue.inner.context.set_geo(position);
					}
					Err(GeoError::PermissionDenied) => {
						info!("geolocation permission denied; not trying again");
						queue.inner.bus.emit(SdkEvent::GeolocationPermissionDenied);
						return;
					}
					Err(err) => {
						debug!(error = %err, "geolocation reading unavailable");
					}
				}
				tokio::time::sleep(interval).await;
			}
		});
	}

	/// Lazily starts the repeating auto-flush. Runs for the remaining
	/// process lifetime; there is no teardown path.
	fn ensure_timer(&self) {
		if self.inner.timer_started.swap(true, Ordering::SeqCst) {
			return;
		}

		let queue = self.clone();
		let period = self.inner.analytics.event_flush_interval;
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			// The first tick fires immediately; the caller already flushed.
			interval.tick().await;
			loop {
				interval.tick().await;
				queue.flush().await;
			}
		});
	}

	async fn drain_and_send(&self) -> usize {
		let mut removed = 0usize;
		let mut attempt: u32 = 1;

		loop {
			let batch: Vec<Event> = {
				let mut queue = self.inner.queue.lock().await;
				if queue.is_empty() {
					break;
				}
				let take = queue.len().min(self.inner.analytics.event_max_processed);
				queue.drain(..take).collect()
			};

			match self.send_batch(&batch).await {
				Ok(()) => {
					debug!(count = batch.len(), "event batch delivered");
					removed += batch.len();
					// Anything left over waits for the next cycle.
					break;
				}
				Err(err) => match self.inner.analytics.retry_mode {
					FlushRetryMode::Discard => {
						error!(
							error = %err,
							lost = batch.len(),
							"event batch failed; discarding and re-flushing the remainder"
						);
						removed += batch.len();
					}
					FlushRetryMode::Requeue => {
						warn!(error = %err, attempt, "event batch failed; re-queueing");
						{
							let mut queue = self.inner.queue.lock().await;
							for event in batch.into_iter().rev() {
								queue.push_front(event);
							}
						}
						if attempt >= self.inner.retry.max_attempts {
							break;
						}
						tokio::time::sleep(self.inner.retry.delay_for(attempt)).await;
						attempt += 1;
					}
				},
			}
		}

		removed
	}

	async fn send_batch(&self, batch: &[Event]) -> Result<(), AnalyticsError> {
		// All events in one batch share the first event's credentials;
		// callers flush before switching sessions.
		let (token_type, access_token) = batch
			.first()
			.and_then(|event| event.credentials.clone())
			.map(|creds| (creds.token_type, creds.access_token))
			.unwrap_or_default();

		let body =
			serde_json::to_value(batch).map_err(|err| AnalyticsError::Serialization(err.to_string()))?;

		let request = ApiRequest::post_json(&self.inner.events_url, body)
			.authorization(&token_type, &access_token)
			.header("Accept", "application/json");

		let response = self.inner.transport.request(request).await?;
		if response.success {
			Ok(())
		} else {
			Err(AnalyticsError::Server {
				status: response.status,
				body: response.body,
			})
		}
	}
}
