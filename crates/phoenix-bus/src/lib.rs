// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process publish/subscribe bus for the Phoenix SDK.
//!
//! Registration is synchronous; dispatch is deferred to a spawned task so
//! `emit` never blocks the caller. A handler that panics is caught and
//! logged, and never prevents the remaining handlers from running.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::error;
use uuid::Uuid;

/// An event that can be published on an [`EventBus`].
///
/// Handlers subscribe to a *kind* rather than a specific payload, so the
/// event type reports which kind it carries.
pub trait BusEvent: Clone + Send + Sync + 'static {
	/// Discriminant used to route events to subscribed handlers.
	type Kind: Copy + Eq + Hash + Send + Sync + 'static;

	/// Returns the kind of this event.
	fn kind(&self) -> Self::Kind;
}

/// Opaque identifier returned by [`EventBus::on`].
///
/// Identifiers are unique per registration across all event kinds, so the
/// same id space can be used for removal lookups everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl HandlerId {
	fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl fmt::Display for HandlerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

type Handler<E> = Arc<dyn Fn(E) + Send + Sync>;

/// A typed publish/subscribe bus.
///
/// Cloning the bus produces another handle to the same registrations.
pub struct EventBus<E: BusEvent> {
	handlers: Arc<Mutex<HashMap<E::Kind, HashMap<HandlerId, Handler<E>>>>>,
}

impl<E: BusEvent> Clone for EventBus<E> {
	fn clone(&self) -> Self {
		Self {
			handlers: Arc::clone(&self.handlers),
		}
	}
}

impl<E: BusEvent> Default for EventBus<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E: BusEvent> EventBus<E> {
	/// Creates an empty bus.
	pub fn new() -> Self {
		Self {
			handlers: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	/// Registers a handler for the given event kind.
	///
	/// Returns an identifier that can later be passed to
	/// [`remove_listener`](Self::remove_listener).
	pub fn on<F>(&self, kind: E::Kind, handler: F) -> HandlerId
	where
		F: Fn(E) + Send + Sync + 'static,
	{
		let id = HandlerId::new();
		let mut handlers = self.handlers.lock().expect("bus lock poisoned");
		handlers
			.entry(kind)
			.or_default()
			.insert(id, Arc::new(handler));
		id
	}

	/// Publishes an event to every handler registered for its kind.
	///
	/// Dispatch happens on a spawned task; the handler set is snapshotted at
	/// emit time, so handlers added afterwards do not observe this event.
	/// Returns the number of handlers that will be notified.
	pub fn emit(&self, event: E) -> usize {
		let snapshot: Vec<Handler<E>> = {
			let handlers = self.handlers.lock().expect("bus lock poisoned");
			match handlers.get(&event.kind()) {
				Some(registered) => registered.values().cloned().collect(),
				None => return 0,
			}
		};

		let notified = snapshot.len();
		if notified == 0 {
			return 0;
		}

		tokio::spawn(async move {
			for handler in snapshot {
				let event = event.clone();
				if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
					error!("bus handler panicked; continuing dispatch");
				}
			}
		});

		notified
	}

	/// Removes a previously registered handler.
	///
	/// Returns true if a handler was removed as a result of this call.
	pub fn remove_listener(&self, kind: E::Kind, id: HandlerId) -> bool {
		let mut handlers = self.handlers.lock().expect("bus lock poisoned");
		handlers
			.get_mut(&kind)
			.map(|registered| registered.remove(&id).is_some())
			.unwrap_or(false)
	}

	/// Returns the number of handlers registered for a kind.
	pub fn handler_count(&self, kind: E::Kind) -> usize {
		let handlers = self.handlers.lock().expect("bus lock poisoned");
		handlers.get(&kind).map(HashMap::len).unwrap_or(0)
	}
}
