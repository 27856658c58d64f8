// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential-holding front door for the event queue.
//!
//! Until the client application has authenticated there are no credentials
//! to attach to events, so anything fired in that window is buffered here.
//! Once credentials arrive the buffer is replayed as analytical events and
//! flushed in one go.

use std::sync::{Arc, Mutex, RwLock};

use serde_json::{Map, Value};
use tracing::debug;

use crate::event::{Event, EventCredentials};
use crate::queue::EventQueue;

struct PendingEvent {
	name: String,
	metadata: Option<Map<String, Value>>,
}

struct SinkInner {
	queue: EventQueue,
	credentials: RwLock<Option<EventCredentials>>,
	pending: Mutex<Vec<PendingEvent>>,
}

/// Fires events with whatever credentials the SDK currently holds.
#[derive(Clone)]
pub struct EventSink {
	inner: Arc<SinkInner>,
}

impl EventSink {
	pub fn new(queue: EventQueue) -> Self {
		Self {
			inner: Arc::new(SinkInner {
				queue,
				credentials: RwLock::new(None),
				pending: Mutex::new(Vec::new()),
			}),
		}
	}

	/// The underlying queue.
	pub fn queue(&self) -> &EventQueue {
		&self.inner.queue
	}

	/// Current credentials, if the client has authenticated.
	pub fn credentials(&self) -> Option<EventCredentials> {
		self.inner
			.credentials
			.read()
			.expect("credential lock poisoned")
			.clone()
	}

	/// Enqueues an analytical event, or buffers it when no credentials are
	/// held yet. Returns the event and queue length once enqueued.
	pub async fn event(
		&self,
		name: &str,
		metadata: Option<Map<String, Value>>,
	) -> Option<(Event, usize)> {
		match self.credentials() {
			Some(credentials) => Some(self.inner.queue.event(credentials, name, metadata, None).await),
			None => {
				self.buffer(name, metadata);
				None
			}
		}
	}

	/// Fires a real-time event, or buffers it when no credentials are held
	/// yet. Buffered events lose their real-time nature: they are replayed
	/// as analytical events followed by a single flush.
	pub async fn now(&self, name: &str, metadata: Option<Map<String, Value>>) -> Option<Event> {
		match self.credentials() {
			Some(credentials) => Some(self.inner.queue.now(credentials, name, metadata, None).await),
			None => {
				self.buffer(name, metadata);
				None
			}
		}
	}

	/// Installs credentials and replays anything buffered before they
	/// existed.
	pub async fn set_credentials(&self, credentials: EventCredentials) {
		{
			let mut slot = self
				.inner
				.credentials
				.write()
				.expect("credential lock poisoned");
			*slot = Some(credentials.clone());
		}

		let pending: Vec<PendingEvent> = {
			let mut pending = self.inner.pending.lock().expect("pending lock poisoned");
			std::mem::take(&mut *pending)
		};

		if pending.is_empty() {
			return;
		}

		debug!(count = pending.len(), "replaying pre-authentication events");
		for event in pending {
			self.inner
				.queue
				.event(credentials.clone(), &event.name, event.metadata, None)
				.await;
		}
		self.inner.queue.flush().await;
	}

	fn buffer(&self, name: &str, metadata: Option<Map<String, Value>>) {
		debug!(event_type = name, "no credentials yet; buffering event");
		self.inner
			.pending
			.lock()
			.expect("pending lock poisoned")
			.push(PendingEvent {
				name: name.to_string(),
				metadata,
			});
	}
}
