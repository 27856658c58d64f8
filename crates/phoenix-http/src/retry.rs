// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backoff schedule for retried deliveries.

use std::time::Duration;

/// Configuration for retry behaviour.
#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Maximum number of attempts, including the first.
	pub max_attempts: u32,
	/// Delay before the first retry.
	pub base_delay: Duration,
	/// Upper bound on any single delay.
	pub max_delay: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(500),
			max_delay: Duration::from_secs(30),
		}
	}
}

impl RetryConfig {
	/// Delay before the retry following `attempt` (1-based), doubled each
	/// attempt and jittered by up to 25% to avoid thundering herds.
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exp = self
			.base_delay
			.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
		let capped = exp.min(self.max_delay);
		let jitter = capped.mul_f64(fastrand::f64() * 0.25);
		capped + jitter
	}
}
