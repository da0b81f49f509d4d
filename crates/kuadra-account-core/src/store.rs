// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource store seam and an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{AccountKey, AccountResource, AccountSpec, AccountStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
	#[error("account resource not found: {key}")]
	NotFound { key: AccountKey },

	#[error("conflicting write to {key}: resource version {expected:?} is stale")]
	Conflict {
		key: AccountKey,
		expected: Option<String>,
	},

	#[error("resource store error: {message}")]
	Backend { message: String },
}

impl StoreError {
	pub fn backend(message: impl Into<String>) -> Self {
		StoreError::Backend {
			message: message.into(),
		}
	}
}

/// Holds desired spec and persisted status of account resources.
///
/// `update_status` writes only the status; spec changes made concurrently by
/// the resource owner are never overwritten. Implementations reject writes
/// carrying a stale `resource_version` with [`StoreError::Conflict`].
#[async_trait]
pub trait AccountStore: Send + Sync {
	/// Load a resource. `Ok(None)` when it does not exist.
	async fn get(&self, key: &AccountKey) -> Result<Option<AccountResource>, StoreError>;

	/// Persist `resource.status` and return the stored copy with its new
	/// resource version.
	async fn update_status(&self, resource: &AccountResource) -> Result<AccountResource, StoreError>;
}

struct ScriptedUpdateFailure {
	after_successes: usize,
	error: StoreError,
}

#[derive(Default)]
struct State {
	resources: HashMap<AccountKey, AccountResource>,
	next_version: u64,
	history: Vec<(AccountKey, AccountStatus)>,
	get_failures: Vec<StoreError>,
	update_failures: Vec<ScriptedUpdateFailure>,
}

impl State {
	fn bump_version(&mut self) -> String {
		self.next_version += 1;
		self.next_version.to_string()
	}
}

/// In-memory store with versioned writes, a log of every persisted status and
/// scripted failures.
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
	state: Arc<Mutex<State>>,
}

impl MemoryAccountStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Create or overwrite a resource as its owner would, including status.
	pub fn insert(&self, resource: AccountResource) -> AccountResource {
		let mut state = self.lock();
		let mut stored = resource;
		stored.resource_version = Some(state.bump_version());
		state.resources.insert(stored.key.clone(), stored.clone());
		stored
	}

	/// Replace the spec, as an owner editing the resource would.
	pub fn update_spec(&self, key: &AccountKey, spec: AccountSpec) -> Result<(), StoreError> {
		let mut state = self.lock();
		let version = state.bump_version();
		let stored = state
			.resources
			.get_mut(key)
			.ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
		stored.spec = spec;
		stored.resource_version = Some(version);
		Ok(())
	}

	pub fn remove(&self, key: &AccountKey) -> Option<AccountResource> {
		self.lock().resources.remove(key)
	}

	pub fn snapshot(&self, key: &AccountKey) -> Option<AccountResource> {
		self.lock().resources.get(key).cloned()
	}

	pub fn status(&self, key: &AccountKey) -> Option<AccountStatus> {
		self.lock().resources.get(key).map(|r| r.status.clone())
	}

	/// Every status successfully persisted through `update_status`, in order.
	pub fn status_history(&self, key: &AccountKey) -> Vec<AccountStatus> {
		self
			.lock()
			.history
			.iter()
			.filter(|(k, _)| k == key)
			.map(|(_, status)| status.clone())
			.collect()
	}

	pub fn update_count(&self) -> usize {
		self.lock().history.len()
	}

	pub fn fail_next_get(&self, error: StoreError) {
		self.lock().get_failures.push(error);
	}

	/// Let `successes` status writes through, then fail the next one.
	pub fn fail_update_after(&self, successes: usize, error: StoreError) {
		self.lock().update_failures.push(ScriptedUpdateFailure {
			after_successes: successes,
			error,
		});
	}

	pub fn fail_next_update(&self, error: StoreError) {
		self.fail_update_after(0, error);
	}
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
	async fn get(&self, key: &AccountKey) -> Result<Option<AccountResource>, StoreError> {
		let mut state = self.lock();
		if !state.get_failures.is_empty() {
			return Err(state.get_failures.remove(0));
		}
		Ok(state.resources.get(key).cloned())
	}

	async fn update_status(&self, resource: &AccountResource) -> Result<AccountResource, StoreError> {
		let mut state = self.lock();

		if let Some(index) = state
			.update_failures
			.iter()
			.position(|f| f.after_successes == 0)
		{
			let failure = state.update_failures.remove(index);
			return Err(failure.error);
		}

		let current_version = match state.resources.get(&resource.key) {
			Some(stored) => stored.resource_version.clone(),
			None => {
				return Err(StoreError::NotFound {
					key: resource.key.clone(),
				})
			}
		};
		if resource.resource_version != current_version {
			return Err(StoreError::Conflict {
				key: resource.key.clone(),
				expected: resource.resource_version.clone(),
			});
		}

		let version = state.bump_version();
		for failure in state.update_failures.iter_mut() {
			failure.after_successes -= 1;
		}
		state
			.history
			.push((resource.key.clone(), resource.status.clone()));

		let stored = state
			.resources
			.get_mut(&resource.key)
			.ok_or_else(|| StoreError::NotFound {
				key: resource.key.clone(),
			})?;
		stored.status = resource.status.clone();
		stored.resource_version = Some(version);
		Ok(stored.clone())
	}
}
