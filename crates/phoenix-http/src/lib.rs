// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for the Phoenix SDK.
//!
//! This crate provides:
//! - The [`HttpTransport`] trait the rest of the SDK talks through
//! - A reqwest-backed implementation with a consistent User-Agent header
//! - The jittered exponential backoff schedule used for retried deliveries

mod client;
mod retry;
mod transport;

pub use client::{builder, new_client, new_client_with_timeout, user_agent};
pub use retry::RetryConfig;
pub use transport::{
	ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport, RequestBody, TransportError,
};
