// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Work queue that decides when each account is reconciled.
//!
//! Triggers arrive on a bounded channel. The dispatcher runs at most one pass
//! per account at a time and at most `max_concurrent` passes overall. A trigger
//! for an account that is already running is folded into a single follow-up
//! pass. A failed pass is retried after an exponential backoff, and the
//! failure count resets on the next success.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use kuadra_account_core::AccountKey;
use kuadra_config::ReconcileConfig;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::{AccountReconciler, ReconcileOutcome};
use crate::error::ReconcileError;

/// Seam between the controller and whatever performs a pass.
#[async_trait]
pub trait Reconcile: Send + Sync + 'static {
	async fn reconcile(
		&self,
		key: &AccountKey,
		cancel: &CancellationToken,
	) -> Result<ReconcileOutcome, ReconcileError>;
}

#[async_trait]
impl Reconcile for AccountReconciler {
	async fn reconcile(
		&self,
		key: &AccountKey,
		cancel: &CancellationToken,
	) -> Result<ReconcileOutcome, ReconcileError> {
		AccountReconciler::reconcile(self, key, cancel).await
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
	pub base: Duration,
	pub max: Duration,
	pub factor: f64,
}

impl Default for BackoffPolicy {
	fn default() -> Self {
		Self::from(&ReconcileConfig::default())
	}
}

impl From<&ReconcileConfig> for BackoffPolicy {
	fn from(config: &ReconcileConfig) -> Self {
		Self {
			base: Duration::from_secs(config.backoff_base_secs),
			max: Duration::from_secs(config.backoff_max_secs),
			factor: config.backoff_factor,
		}
	}
}

/// Delay before retrying after `consecutive_failures` failed passes:
/// `min(base * factor^(n-1), max)`.
pub fn calculate_backoff_delay(policy: &BackoffPolicy, consecutive_failures: u32) -> Duration {
	let exponent = consecutive_failures.saturating_sub(1).min(i32::MAX as u32) as i32;
	let secs = policy.base.as_secs_f64() * policy.factor.powi(exponent);
	if secs.is_finite() && secs < policy.max.as_secs_f64() {
		Duration::from_secs_f64(secs)
	} else {
		policy.max
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
	pub max_concurrent: usize,
	pub queue_capacity: usize,
	pub backoff: BackoffPolicy,
}

impl Default for ControllerConfig {
	fn default() -> Self {
		Self::from(&ReconcileConfig::default())
	}
}

impl From<&ReconcileConfig> for ControllerConfig {
	fn from(config: &ReconcileConfig) -> Self {
		Self {
			max_concurrent: config.max_concurrent.max(1),
			queue_capacity: config.queue_capacity.max(1),
			backoff: BackoffPolicy::from(config),
		}
	}
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountHealth {
	pub key: AccountKey,
	pub status: HealthState,
	pub consecutive_failures: u32,
	pub last_error: Option<String>,
	pub runs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerHealth {
	pub status: HealthState,
	pub accounts: Vec<AccountHealth>,
}

pub(crate) fn determine_health_state(consecutive_failures: u32) -> HealthState {
	if consecutive_failures >= 3 {
		HealthState::Unhealthy
	} else if consecutive_failures >= 1 {
		HealthState::Degraded
	} else {
		HealthState::Healthy
	}
}

#[derive(Default)]
struct AccountRecord {
	consecutive_failures: u32,
	last_error: Option<String>,
	runs: u64,
}

#[derive(Default)]
struct HealthRegistry {
	accounts: HashMap<AccountKey, AccountRecord>,
}

impl HealthRegistry {
	fn record_success(&mut self, key: &AccountKey) {
		let record = self.accounts.entry(key.clone()).or_default();
		record.runs += 1;
		record.consecutive_failures = 0;
		record.last_error = None;
	}

	fn record_failure(&mut self, key: &AccountKey, message: String) -> u32 {
		let record = self.accounts.entry(key.clone()).or_default();
		record.runs += 1;
		record.consecutive_failures += 1;
		record.last_error = Some(message);
		record.consecutive_failures
	}

	fn snapshot(&self) -> ControllerHealth {
		let mut accounts: Vec<AccountHealth> = self
			.accounts
			.iter()
			.map(|(key, record)| AccountHealth {
				key: key.clone(),
				status: determine_health_state(record.consecutive_failures),
				consecutive_failures: record.consecutive_failures,
				last_error: record.last_error.clone(),
				runs: record.runs,
			})
			.collect();
		accounts.sort_by(|a, b| a.key.cmp(&b.key));

		let mut worst_state = HealthState::Healthy;
		for account in &accounts {
			if account.status == HealthState::Unhealthy {
				worst_state = HealthState::Unhealthy;
			} else if account.status == HealthState::Degraded && worst_state != HealthState::Unhealthy {
				worst_state = HealthState::Degraded;
			}
		}

		ControllerHealth {
			status: worst_state,
			accounts,
		}
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
	#[error("controller is shut down")]
	ShutDown,
}

/// Cloneable front door to a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
	triggers: mpsc::Sender<AccountKey>,
	registry: Arc<Mutex<HealthRegistry>>,
	shutdown: CancellationToken,
}

impl ControllerHandle {
	/// Ask for `key` to be reconciled. Waits while the queue is full.
	pub async fn trigger(&self, key: AccountKey) -> Result<(), ControllerError> {
		if self.shutdown.is_cancelled() {
			return Err(ControllerError::ShutDown);
		}
		self
			.triggers
			.send(key)
			.await
			.map_err(|_| ControllerError::ShutDown)
	}

	pub fn health(&self) -> ControllerHealth {
		lock(&self.registry).snapshot()
	}

	pub fn account_health(&self, key: &AccountKey) -> Option<AccountHealth> {
		self
			.health()
			.accounts
			.into_iter()
			.find(|account| &account.key == key)
	}
}

/// A running controller. Dropping it does not stop the dispatcher; call
/// [`Controller::shutdown`] or cancel the token passed to [`Controller::start`].
pub struct Controller {
	handle: ControllerHandle,
	task: JoinHandle<()>,
}

impl Controller {
	/// Spawn the dispatcher. Cancelling `shutdown` stops it.
	pub fn start(
		reconciler: Arc<dyn Reconcile>,
		config: ControllerConfig,
		shutdown: CancellationToken,
	) -> Self {
		let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
		let registry = Arc::new(Mutex::new(HealthRegistry::default()));

		let dispatcher = Dispatcher {
			reconciler,
			config,
			permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
			registry: Arc::clone(&registry),
			retries_tx: tx.clone(),
			shutdown: shutdown.clone(),
			in_flight: HashSet::new(),
			dirty: HashSet::new(),
			retries: HashMap::new(),
			runs: JoinSet::new(),
		};
		let task = tokio::spawn(dispatcher.run(rx));

		info!(
			max_concurrent = config.max_concurrent,
			queue_capacity = config.queue_capacity,
			"account controller started"
		);

		Self {
			handle: ControllerHandle {
				triggers: tx,
				registry,
				shutdown,
			},
			task,
		}
	}

	pub fn handle(&self) -> ControllerHandle {
		self.handle.clone()
	}

	/// Stop accepting triggers, cancel in-flight passes and wait for them.
	#[instrument(skip(self))]
	pub async fn shutdown(self) {
		self.handle.shutdown.cancel();
		if let Err(e) = self.task.await {
			error!(error = %e, "controller dispatcher panicked");
		}
	}
}

enum RunResult {
	Succeeded,
	Cancelled,
	Failed(String),
}

struct Dispatcher {
	reconciler: Arc<dyn Reconcile>,
	config: ControllerConfig,
	permits: Arc<Semaphore>,
	registry: Arc<Mutex<HealthRegistry>>,
	retries_tx: mpsc::Sender<AccountKey>,
	shutdown: CancellationToken,
	in_flight: HashSet<AccountKey>,
	/// Accounts triggered again while running.
	dirty: HashSet<AccountKey>,
	/// Pending backoff timers, one per failing account.
	retries: HashMap<AccountKey, CancellationToken>,
	runs: JoinSet<(AccountKey, RunResult)>,
}

impl Dispatcher {
	async fn run(mut self, mut rx: mpsc::Receiver<AccountKey>) {
		loop {
			tokio::select! {
				_ = self.shutdown.cancelled() => break,
				Some(key) = rx.recv() => self.schedule(key),
				Some(joined) = self.runs.join_next(), if !self.runs.is_empty() => match joined {
					Ok((key, result)) => self.finish(key, result),
					Err(e) => error!(error = %e, "reconcile task failed to join"),
				},
			}
		}

		rx.close();
		for timer in self.retries.values() {
			timer.cancel();
		}
		while let Some(joined) = self.runs.join_next().await {
			if let Ok((key, result)) = joined {
				self.record(&key, &result);
			}
		}
		info!("account controller shut down");
	}

	fn schedule(&mut self, key: AccountKey) {
		if self.in_flight.contains(&key) {
			debug!(account = %key, "reconcile already running, coalescing trigger");
			self.dirty.insert(key);
			return;
		}
		if let Some(timer) = self.retries.remove(&key) {
			timer.cancel();
		}

		self.in_flight.insert(key.clone());
		let reconciler = Arc::clone(&self.reconciler);
		let permits = Arc::clone(&self.permits);
		let cancel = self.shutdown.child_token();

		self.runs.spawn(async move {
			let _permit = tokio::select! {
				permit = permits.acquire_owned() => match permit {
					Ok(permit) => permit,
					Err(_) => return (key, RunResult::Cancelled),
				},
				_ = cancel.cancelled() => return (key, RunResult::Cancelled),
			};

			let result = AssertUnwindSafe(reconciler.reconcile(&key, &cancel))
				.catch_unwind()
				.await;
			let result = match result {
				Ok(Ok(_)) => RunResult::Succeeded,
				Ok(Err(e)) if e.is_cancelled() => RunResult::Cancelled,
				Ok(Err(e)) => RunResult::Failed(e.to_string()),
				Err(_) => RunResult::Failed("reconcile panicked".to_string()),
			};
			(key, result)
		});
	}

	fn record(&self, key: &AccountKey, result: &RunResult) -> Option<u32> {
		let mut registry = lock(&self.registry);
		match result {
			RunResult::Succeeded => {
				registry.record_success(key);
				None
			}
			RunResult::Failed(message) => Some(registry.record_failure(key, message.clone())),
			RunResult::Cancelled => None,
		}
	}

	fn finish(&mut self, key: AccountKey, result: RunResult) {
		self.in_flight.remove(&key);
		let failures = self.record(&key, &result);

		if self.dirty.remove(&key) {
			self.schedule(key);
			return;
		}

		if let (Some(failures), RunResult::Failed(message)) = (failures, &result) {
			let delay = calculate_backoff_delay(&self.config.backoff, failures);
			warn!(
				account = %key,
				consecutive_failures = failures,
				delay_ms = delay.as_millis() as u64,
				error = %message,
				"reconcile failed, requeueing"
			);
			self.requeue_after(key, delay);
		}
	}

	fn requeue_after(&mut self, key: AccountKey, delay: Duration) {
		let timer = self.shutdown.child_token();
		if let Some(previous) = self.retries.insert(key.clone(), timer.clone()) {
			previous.cancel();
		}

		let tx = self.retries_tx.clone();
		tokio::spawn(async move {
			tokio::select! {
				_ = timer.cancelled() => {}
				_ = tokio::time::sleep(delay) => {
					let _ = tx.send(key).await;
				}
			}
		});
	}
}

fn lock(registry: &Mutex<HealthRegistry>) -> MutexGuard<'_, HealthRegistry> {
	registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
