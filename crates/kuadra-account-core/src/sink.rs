// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Destination for credentials minted during provisioning.
//!
//! The reconciler hands each login password and access key pair to a
//! [`SecretSink`] before it records the stage as complete. If delivery fails
//! the stage stays pending and the credential is minted again on retry.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use kuadra_common_secret::SecretFields;
use thiserror::Error;

use crate::model::AccountKey;

pub const PASSWORD_FIELD: &str = "password";
pub const ACCESS_KEY_ID_FIELD: &str = "accessKeyId";
pub const SECRET_ACCESS_KEY_FIELD: &str = "secretAccessKey";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
	#[error("secret sink unavailable: {message}")]
	Unavailable { message: String },

	#[error("secret sink rejected {key}: {message}")]
	Rejected { key: AccountKey, message: String },
}

impl SinkError {
	pub fn unavailable(message: impl Into<String>) -> Self {
		SinkError::Unavailable {
			message: message.into(),
		}
	}
}

#[async_trait]
pub trait SecretSink: Send + Sync {
	async fn store_secret(&self, key: &AccountKey, fields: SecretFields) -> Result<(), SinkError>;
}

/// Records that credentials were produced without keeping them. Values are
/// dropped after logging the field names.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSecretSink;

impl TracingSecretSink {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl SecretSink for TracingSecretSink {
	async fn store_secret(&self, key: &AccountKey, fields: SecretFields) -> Result<(), SinkError> {
		tracing::info!(
			account = %key,
			fields = ?fields.names(),
			"credentials generated; no secret store configured, values discarded"
		);
		Ok(())
	}
}

/// Keeps every delivery in memory.
#[derive(Clone, Default)]
pub struct MemorySecretSink {
	inner: Arc<Mutex<MemorySinkState>>,
}

#[derive(Default)]
struct MemorySinkState {
	deliveries: Vec<(AccountKey, SecretFields)>,
	failures: Vec<SinkError>,
}

impl MemorySecretSink {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, MemorySinkState> {
		self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn deliveries(&self) -> Vec<(AccountKey, SecretFields)> {
		self.lock().deliveries.clone()
	}

	pub fn deliveries_for(&self, key: &AccountKey) -> Vec<SecretFields> {
		self
			.lock()
			.deliveries
			.iter()
			.filter(|(k, _)| k == key)
			.map(|(_, fields)| fields.clone())
			.collect()
	}

	/// Fail the next delivery with `error`.
	pub fn fail_once(&self, error: SinkError) {
		self.lock().failures.push(error);
	}
}

#[async_trait]
impl SecretSink for MemorySecretSink {
	async fn store_secret(&self, key: &AccountKey, fields: SecretFields) -> Result<(), SinkError> {
		let mut state = self.lock();
		if !state.failures.is_empty() {
			return Err(state.failures.remove(0));
		}
		state.deliveries.push((key.clone(), fields));
		Ok(())
	}
}
