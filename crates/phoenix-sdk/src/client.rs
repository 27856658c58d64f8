// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The SDK facade: one handle wiring identity, analytics and the bus.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use phoenix_analytics::{
	DeviceContext, Event, EventQueue, EventSink, GeolocationProvider, IpResolver, IpifyResolver,
};
use phoenix_bus::HandlerId;
use phoenix_core::{Bus, ConfigError, PhoenixConfig, SdkEvent, SdkEventKind};
use phoenix_http::{HttpTransport, ReqwestTransport};
use phoenix_identity::{
	AccessToken, FileTokenStore, IdentityService, MemoryTokenStore, TokenStore,
};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::Result;

/// SDK version, stamped into outgoing events.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builder for [`Phoenix`].
pub struct PhoenixBuilder {
	config: Option<PhoenixConfig>,
	transport: Option<Arc<dyn HttpTransport>>,
	store: Option<Arc<dyn TokenStore>>,
	geolocation: Option<Arc<dyn GeolocationProvider>>,
	ip_resolver: Option<Arc<dyn IpResolver>>,
	device: Option<DeviceContext>,
}

impl PhoenixBuilder {
	/// Creates a new builder with default collaborators.
	pub fn new() -> Self {
		Self {
			config: None,
			transport: None,
			store: None,
			geolocation: None,
			ip_resolver: None,
			device: None,
		}
	}

	/// Sets the SDK configuration (required).
	pub fn config(mut self, config: PhoenixConfig) -> Self {
		self.config = Some(config);
		self
	}

	/// Replaces the HTTP transport. Defaults to a shared reqwest client.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Replaces the token store. Defaults to a JSON file under the user's
	/// home directory, or in-memory storage when no home exists.
	pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);
		self
	}

	/// Supplies a geolocation source. Without one, events carry no
	/// location even when geolocation is enabled in the configuration.
	pub fn geolocation(mut self, provider: Arc<dyn GeolocationProvider>) -> Self {
		self.geolocation = Some(provider);
		self
	}

	/// Replaces the public IP resolver. Defaults to the ipify lookup.
	pub fn ip_resolver(mut self, resolver: Arc<dyn IpResolver>) -> Self {
		self.ip_resolver = Some(resolver);
		self
	}

	/// Replaces the device snapshot stamped into events.
	pub fn device(mut self, device: DeviceContext) -> Self {
		self.device = Some(device);
		self
	}

	/// Wires everything together. Nothing touches the network until
	/// [`Phoenix::connect`] is called.
	pub fn build(self) -> Result<Phoenix> {
		// A builder without a configuration has no client identity at all.
		let config = self.config.ok_or(ConfigError::MissingClientId)?;

		let transport = self
			.transport
			.unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

		let store = self.store.unwrap_or_else(|| {
			match FileTokenStore::default_path(&config.access_token_key) {
				Some(path) => Arc::new(FileTokenStore::new(path)),
				None => {
					warn!("no home directory; remembered tokens will not survive restarts");
					Arc::new(MemoryTokenStore::new())
				}
			}
		});

		let ip_resolver = self
			.ip_resolver
			.or_else(|| Some(Arc::new(IpifyResolver::new(Arc::clone(&transport))) as Arc<dyn IpResolver>));

		let bus = Bus::new();
		let device = self.device.unwrap_or_else(DeviceContext::host);
		let queue = EventQueue::new(&config, Arc::clone(&transport), bus.clone(), device);
		let sink = EventSink::new(queue.clone());
		let identity = IdentityService::new(
			config.clone(),
			Arc::clone(&transport),
			store,
			sink.clone(),
			bus.clone(),
		);

		Ok(Phoenix {
			inner: Arc::new(PhoenixInner {
				bus,
				queue,
				sink,
				identity,
				geolocation: self.geolocation,
				ip_resolver,
				client_token: RwLock::new(None),
				connected: AtomicBool::new(false),
			}),
		})
	}
}

impl Default for PhoenixBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct PhoenixInner {
	bus: Bus,
	queue: EventQueue,
	sink: EventSink,
	identity: IdentityService,
	geolocation: Option<Arc<dyn GeolocationProvider>>,
	ip_resolver: Option<Arc<dyn IpResolver>>,
	client_token: RwLock<Option<AccessToken>>,
	connected: AtomicBool,
}

/// The Phoenix Intelligence SDK handle. Cheap to clone.
#[derive(Clone)]
pub struct Phoenix {
	inner: Arc<PhoenixInner>,
}

// Hand-written so the client token's secrets stay out of log output.
impl fmt::Debug for Phoenix {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Phoenix")
			.field("connected", &self.inner.connected.load(Ordering::SeqCst))
			.finish_non_exhaustive()
	}
}

impl Phoenix {
	/// Starts building an SDK instance.
	pub fn builder() -> PhoenixBuilder {
		PhoenixBuilder::new()
	}

	/// Connects the SDK: authenticates the client application, replays any
	/// events fired before the connection existed and starts the analytics
	/// background work. Idempotent; later calls return immediately.
	pub async fn connect(&self) -> Result<()> {
		if self.inner.connected.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		let token = match self.inner.identity.authenticate(None, None, false).await {
			Ok(token) => token,
			Err(err) => {
				self.inner.connected.store(false, Ordering::SeqCst);
				return Err(err.into());
			}
		};

		info!("client application authenticated");
		let credentials = token.credentials().map_err(crate::error::PhoenixError::Identity)?;
		let token_info = token.info();
		{
			let mut slot = self
				.inner
				.client_token
				.write()
				.expect("client token lock poisoned");
			*slot = Some(token);
		}

		self.inner.bus.emit(SdkEvent::ClientAuthenticated { token: token_info });
		// Replays anything buffered before the client token existed.
		self.inner.sink.set_credentials(credentials).await;

		self.inner.queue.init(self.inner.ip_resolver.clone()).await;
		if let Some(provider) = &self.inner.geolocation {
			self.inner.queue.start_geolocation(Arc::clone(provider));
		}

		Ok(())
	}

	/// Creates an analytical event under the client session. Before
	/// [`connect`](Self::connect) completes, events are buffered and
	/// replayed once the client token exists; `None` marks a buffered
	/// event.
	pub async fn event(
		&self,
		name: &str,
		metadata: Option<Map<String, Value>>,
	) -> Option<(Event, usize)> {
		self.inner.sink.event(name, metadata).await
	}

	/// Creates a real-time event under the client session, forcing the
	/// queue out. Buffered instead when not yet connected.
	pub async fn now(&self, name: &str, metadata: Option<Map<String, Value>>) -> Option<Event> {
		self.inner.sink.now(name, metadata).await
	}

	/// Sends queued events now. Returns the number of events removed.
	pub async fn flush(&self) -> usize {
		self.inner.queue.flush().await
	}

	/// Number of events waiting in the queue.
	pub async fn event_count(&self) -> usize {
		self.inner.queue.event_count().await
	}

	/// Authenticates a user with their username and password.
	pub async fn authenticate(
		&self,
		username: &str,
		password: &str,
		remember_me: bool,
	) -> Result<AccessToken> {
		Ok(self
			.inner
			.identity
			.authenticate(Some(username), Some(password), remember_me)
			.await?)
	}

	/// Validates an explicit token pair.
	pub async fn validate(&self, token_type: &str, access_token: &str) -> Result<AccessToken> {
		Ok(self.inner.identity.validate(token_type, access_token).await?)
	}

	/// Validates the remembered token, if one was persisted.
	pub async fn validate_stored(&self) -> Result<AccessToken> {
		Ok(self.inner.identity.validate_stored().await?)
	}

	/// Expires the remembered token.
	pub async fn expire(&self, access_token: &str) -> Result<()> {
		Ok(self.inner.identity.expire(access_token).await?)
	}

	/// Whether a user authenticate or validate attempt is in flight.
	pub fn is_resolving(&self) -> bool {
		self.inner.identity.is_resolving()
	}

	/// Registers a handler for one kind of SDK event.
	pub fn on<F>(&self, kind: SdkEventKind, handler: F) -> HandlerId
	where
		F: Fn(SdkEvent) + Send + Sync + 'static,
	{
		self.inner.bus.on(kind, handler)
	}

	/// Removes a previously registered handler.
	pub fn remove_listener(&self, kind: SdkEventKind, id: HandlerId) -> bool {
		self.inner.bus.remove_listener(kind, id)
	}

	/// The client application's token, once [`connect`](Self::connect) has
	/// succeeded.
	pub fn client_token(&self) -> Option<AccessToken> {
		self.inner
			.client_token
			.read()
			.expect("client token lock poisoned")
			.clone()
	}

	/// The shared event bus.
	pub fn bus(&self) -> &Bus {
		&self.inner.bus
	}
}
