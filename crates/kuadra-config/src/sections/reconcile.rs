// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reconcile scheduling configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconcileConfigLayer {
	pub max_concurrent: Option<usize>,
	pub backoff_base_secs: Option<u64>,
	pub backoff_max_secs: Option<u64>,
	pub backoff_factor: Option<f64>,
	pub queue_capacity: Option<usize>,
}

impl ReconcileConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.max_concurrent.is_some() {
			self.max_concurrent = other.max_concurrent;
		}
		if other.backoff_base_secs.is_some() {
			self.backoff_base_secs = other.backoff_base_secs;
		}
		if other.backoff_max_secs.is_some() {
			self.backoff_max_secs = other.backoff_max_secs;
		}
		if other.backoff_factor.is_some() {
			self.backoff_factor = other.backoff_factor;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
	}

	pub fn finalize(self) -> ReconcileConfig {
		let defaults = ReconcileConfig::default();
		ReconcileConfig {
			max_concurrent: self.max_concurrent.unwrap_or(defaults.max_concurrent),
			backoff_base_secs: self.backoff_base_secs.unwrap_or(defaults.backoff_base_secs),
			backoff_max_secs: self.backoff_max_secs.unwrap_or(defaults.backoff_max_secs),
			backoff_factor: self.backoff_factor.unwrap_or(defaults.backoff_factor),
			queue_capacity: self.queue_capacity.unwrap_or(defaults.queue_capacity),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileConfig {
	/// Accounts reconciled in parallel.
	pub max_concurrent: usize,
	pub backoff_base_secs: u64,
	pub backoff_max_secs: u64,
	pub backoff_factor: f64,
	/// Pending triggers buffered before senders wait.
	pub queue_capacity: usize,
}

impl Default for ReconcileConfig {
	fn default() -> Self {
		Self {
			max_concurrent: 4,
			backoff_base_secs: 1,
			backoff_max_secs: 300,
			backoff_factor: 2.0,
			queue_capacity: 1024,
		}
	}
}
