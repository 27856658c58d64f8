// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity for the Phoenix SDK: token grants, validation, expiry and the
//! account information attached to an authenticated user.
//!
//! The entry point is [`IdentityService`]; everything user-facing flows
//! through the [`AccessToken`] handles it issues.

mod error;
mod service;
mod store;
mod token;

pub use error::{IdentityError, Result, StoreError};
pub use service::{IdentityService, TokenResponse};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::AccessToken;
