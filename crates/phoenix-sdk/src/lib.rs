// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Phoenix Intelligence client SDK.
//!
//! One [`Phoenix`] handle wires together the three halves of the SDK: the
//! identity module (token grants, validation, account information), the
//! analytics module (queued event batches) and the event bus observers
//! subscribe to.
//!
//! ```ignore
//! let phoenix = Phoenix::builder()
//!     .config(
//!         PhoenixConfig::builder()
//!             .client_id("<my api key>")
//!             .client_secret("<my super secret>")
//!             .project_id("2000")
//!             .build()?,
//!     )
//!     .build()?;
//!
//! phoenix.connect().await?;
//! let token = phoenix.authenticate("username", "password", true).await?;
//! token.event("MyApp.Something.Happened", None, None).await?;
//! ```

mod client;
mod error;

pub use client::{Phoenix, PhoenixBuilder, VERSION};
pub use error::{PhoenixError, Result};

pub use phoenix_analytics::{
	DeviceContext, Event, EventCredentials, GeoError, GeoPosition, GeolocationProvider,
	IpResolver, IpifyResolver,
};
pub use phoenix_bus::HandlerId;
pub use phoenix_core::{
	AnalyticsConfig, Company, ConfigError, FlushRetryMode, IdentityConfig, PhoenixConfig,
	PhoenixConfigBuilder, Project, Provider, SdkEvent, SdkEventKind, StoredToken, TokenInfo, User,
};
pub use phoenix_identity::{
	AccessToken, FileTokenStore, IdentityError, MemoryTokenStore, TokenStore,
};
