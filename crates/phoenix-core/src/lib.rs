// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared types for the Phoenix SDK: configuration, entity records,
//! endpoint templating and the SDK event vocabulary.

mod config;
mod endpoints;
mod entities;
mod events;
mod token;

pub use config::{
	AnalyticsConfig, ConfigError, FlushRetryMode, IdentityConfig, PhoenixConfig,
	PhoenixConfigBuilder,
};
pub use endpoints::Endpoints;
pub use entities::{Company, PagedResponse, Project, Provider, User};
pub use events::{Bus, SdkEvent, SdkEventKind, TokenInfo};
pub use token::StoredToken;
