// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics event queue and batch flusher for the Phoenix SDK.
//!
//! There are two types of events: real-time and analytical. Analytical
//! events are buffered and sent at a convenient time to reduce server hits
//! and network activity; real-time events force the whole queue out
//! immediately, on the assumption they trigger actions at the API layer.
//!
//! Geolocation, when enabled, is appended to events once a reading is
//! available.

mod context;
mod error;
mod event;
mod geo;
mod queue;
mod sink;

pub use context::{DeviceContext, EventContext};
pub use error::{AnalyticsError, Result};
pub use event::{Event, EventCredentials, Geolocation};
pub use geo::{GeoError, GeoPosition, GeolocationProvider, IpResolver, IpifyResolver};
pub use queue::EventQueue;
pub use sink::EventSink;
