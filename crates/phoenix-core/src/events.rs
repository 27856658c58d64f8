// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The SDK event vocabulary published on the bus.
//!
//! Payloads are data snapshots: token events carry a [`TokenInfo`] rather
//! than a live token handle, so secrets never travel through the bus.

use chrono::{DateTime, Utc};
use phoenix_bus::{BusEvent, EventBus};

use crate::entities::{Company, Project, Provider, User};

/// The bus type the SDK threads through its components.
pub type Bus = EventBus<SdkEvent>;

/// Non-secret snapshot of an access token.
#[derive(Debug, Clone)]
pub struct TokenInfo {
	/// Normalized token type, e.g. `Bearer`.
	pub token_type: String,
	/// When the token expires.
	pub expires: DateTime<Utc>,
	/// When the token was created.
	pub created: DateTime<Utc>,
	/// Whether this token represents an end user rather than the client.
	pub is_user_token: bool,
}

/// Events published by the SDK.
#[derive(Debug, Clone)]
pub enum SdkEvent {
	/// An authenticate or validate attempt has started.
	Resolving,
	/// An authenticate or validate attempt has completed.
	/// The token is absent if the attempt failed.
	Resolved { token: Option<TokenInfo> },
	/// A user has been authenticated.
	Authenticated { token: TokenInfo },
	/// The client application has been authenticated.
	ClientAuthenticated { token: TokenInfo },
	/// A stored or explicit token has been validated.
	Validated { token: TokenInfo },
	/// A token has been refreshed in place.
	Refreshed { token: TokenInfo },
	/// A token has been expired.
	Expired,
	/// User information has arrived for the authenticated user.
	UpdatedUser { user: User },
	/// The accessible provider list has arrived.
	UpdatedProviders { providers: Vec<Provider> },
	/// The accessible company list has arrived.
	UpdatedCompanies { companies: Vec<Company> },
	/// The aggregate project list is complete across all companies.
	UpdatedProjects { projects: Vec<Project> },
	/// The user denied access to location information.
	GeolocationPermissionDenied,
}

/// Discriminant for [`SdkEvent`], used to subscribe to a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkEventKind {
	Resolving,
	Resolved,
	Authenticated,
	ClientAuthenticated,
	Validated,
	Refreshed,
	Expired,
	UpdatedUser,
	UpdatedProviders,
	UpdatedCompanies,
	UpdatedProjects,
	GeolocationPermissionDenied,
}

impl BusEvent for SdkEvent {
	type Kind = SdkEventKind;

	fn kind(&self) -> SdkEventKind {
		match self {
			SdkEvent::Resolving => SdkEventKind::Resolving,
			SdkEvent::Resolved { .. } => SdkEventKind::Resolved,
			SdkEvent::Authenticated { .. } => SdkEventKind::Authenticated,
			SdkEvent::ClientAuthenticated { .. } => SdkEventKind::ClientAuthenticated,
			SdkEvent::Validated { .. } => SdkEventKind::Validated,
			SdkEvent::Refreshed { .. } => SdkEventKind::Refreshed,
			SdkEvent::Expired => SdkEventKind::Expired,
			SdkEvent::UpdatedUser { .. } => SdkEventKind::UpdatedUser,
			SdkEvent::UpdatedProviders { .. } => SdkEventKind::UpdatedProviders,
			SdkEvent::UpdatedCompanies { .. } => SdkEventKind::UpdatedCompanies,
			SdkEvent::UpdatedProjects { .. } => SdkEventKind::UpdatedProjects,
			SdkEvent::GeolocationPermissionDenied => SdkEventKind::GeolocationPermissionDenied,
		}
	}
}
