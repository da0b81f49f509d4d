// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-pass account reconciliation.
//!
//! A pass loads the account, runs every pending bootstrap stage in order, then
//! joins the groups the spec asks for. Each completed side effect is followed
//! by a status write before anything else happens, so the persisted status is
//! always a safe point to resume from. The first failure ends the pass.

use std::future::Future;
use std::sync::Arc;

use kuadra_account_core::groups;
use kuadra_account_core::{
	AccountKey, AccountResource, AccountState, AccountStore, BootstrapStage, SecretSink,
	ACCESS_KEY_ID_FIELD, PASSWORD_FIELD, SECRET_ACCESS_KEY_FIELD,
};
use kuadra_common_secret::{SecretFields, SecretString};
use kuadra_iam::IamClient;
use kuadra_password::{PasswordGenerator, PasswordPolicy, RandomPasswordGenerator};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ReconcileError, Stage};

/// Summary of a pass that reached the end without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
	pub key: AccountKey,
	pub initial_state: AccountState,
	pub final_state: AccountState,
	pub stages_completed: Vec<BootstrapStage>,
	pub groups_added: Vec<String>,
	/// Groups the user belongs to but the spec no longer lists. Never acted on.
	pub pending_removals: Vec<String>,
}

impl ReconcileReport {
	/// True when the pass changed nothing.
	pub fn is_noop(&self) -> bool {
		self.stages_completed.is_empty() && self.groups_added.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
	/// The resource no longer exists. Nothing to do.
	NotFound,
	Converged(ReconcileReport),
}

/// Drives one account toward its declared state.
pub struct AccountReconciler {
	store: Arc<dyn AccountStore>,
	iam: Arc<dyn IamClient>,
	passwords: Arc<dyn PasswordGenerator>,
	sink: Arc<dyn SecretSink>,
	policy: PasswordPolicy,
}

impl AccountReconciler {
	pub fn new(
		store: Arc<dyn AccountStore>,
		iam: Arc<dyn IamClient>,
		sink: Arc<dyn SecretSink>,
	) -> Self {
		Self {
			store,
			iam,
			passwords: Arc::new(RandomPasswordGenerator::new()),
			sink,
			policy: PasswordPolicy::LOGIN_PROFILE,
		}
	}

	pub fn with_password_generator(mut self, passwords: Arc<dyn PasswordGenerator>) -> Self {
		self.passwords = passwords;
		self
	}

	pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
		self.policy = policy;
		self
	}

	#[instrument(skip(self, key, cancel), fields(namespace = %key.namespace, name = %key.name))]
	pub async fn reconcile(
		&self,
		key: &AccountKey,
		cancel: &CancellationToken,
	) -> Result<ReconcileOutcome, ReconcileError> {
		let result = self.run(key, cancel).await;
		match &result {
			Ok(ReconcileOutcome::Converged(report)) if !report.is_noop() => info!(
				from = %report.initial_state,
				to = %report.final_state,
				stages = report.stages_completed.len(),
				groups_added = report.groups_added.len(),
				"account reconciled"
			),
			Ok(_) => {}
			Err(e) if e.is_cancelled() => warn!(error = %e, "reconcile cancelled"),
			Err(e) => error!(
				stage = %e.stage().map(|s| s.to_string()).unwrap_or_default(),
				error = %e,
				"reconcile failed"
			),
		}
		result
	}

	async fn run(
		&self,
		key: &AccountKey,
		cancel: &CancellationToken,
	) -> Result<ReconcileOutcome, ReconcileError> {
		let loaded = guarded(cancel, &Stage::Load, self.store.get(key))
			.await?
			.map_err(|source| ReconcileError::Store {
				stage: Stage::Load,
				source,
			})?;
		let Some(mut resource) = loaded else {
			debug!("account resource not found");
			return Ok(ReconcileOutcome::NotFound);
		};

		let initial_state = resource.status.account_state;
		let mut stages_completed = Vec::new();
		while let Some(stage) = resource.status.account_state.pending_stage() {
			self.run_stage(&mut resource, stage, cancel).await?;
			stages_completed.push(stage);
		}

		let (groups_added, pending_removals) = self.sync_groups(&mut resource, cancel).await?;

		Ok(ReconcileOutcome::Converged(ReconcileReport {
			key: resource.key,
			initial_state,
			final_state: resource.status.account_state,
			stages_completed,
			groups_added,
			pending_removals,
		}))
	}

	#[instrument(skip(self, resource, stage, cancel), fields(user_name = %resource.spec.user_name, stage = %stage))]
	async fn run_stage(
		&self,
		resource: &mut AccountResource,
		stage: BootstrapStage,
		cancel: &CancellationToken,
	) -> Result<(), ReconcileError> {
		let at = Stage::from(stage);
		let user_name = resource.spec.user_name.as_str();
		let iam_failed = |source| ReconcileError::Iam {
			stage: at.clone(),
			source,
		};

		match stage {
			BootstrapStage::CreateUser => {
				let user = guarded(cancel, &at, self.iam.create_user(user_name))
					.await?
					.map_err(iam_failed)?;
				debug!(user_id = %user.user_id, arn = %user.arn, "IAM user ready");
			}
			BootstrapStage::CreateLoginProfile => {
				let password = self
					.passwords
					.generate(&self.policy)
					.map_err(|source| ReconcileError::Password { source })?;
				guarded(
					cancel,
					&at,
					self.iam.create_login_profile(&password, user_name, true),
				)
				.await?
				.map_err(iam_failed)?;

				let fields = SecretFields::new().with(PASSWORD_FIELD, password);
				self.deliver(&resource.key, fields, &at, cancel).await?;
			}
			BootstrapStage::CreateAccessKey => {
				let pair = guarded(cancel, &at, self.iam.create_access_key_pair(user_name))
					.await?
					.map_err(iam_failed)?;

				let fields = SecretFields::new()
					.with(
						ACCESS_KEY_ID_FIELD,
						SecretString::from(pair.access_key_id.clone()),
					)
					.with(SECRET_ACCESS_KEY_FIELD, pair.secret_access_key);
				self.deliver(&resource.key, fields, &at, cancel).await?;
			}
		}

		let mut next = resource.clone();
		next.status.account_state = resource.status.account_state.complete(stage)?;
		*resource = self.persist(&next, at, cancel).await?;
		debug!(state = %resource.status.account_state, "stage completed");
		Ok(())
	}

	/// Join every desired group the status does not list yet. Returns the
	/// groups joined and the groups that would be left if removal were enabled.
	async fn sync_groups(
		&self,
		resource: &mut AccountResource,
		cancel: &CancellationToken,
	) -> Result<(Vec<String>, Vec<String>), ReconcileError> {
		let diff = groups::diff(&resource.spec.groups, &resource.status.user_groups);
		if !diff.to_remove.is_empty() {
			debug!(groups = ?diff.to_remove, "groups no longer desired; removal is disabled");
		}

		let user_name = resource.spec.user_name.clone();
		let mut added = Vec::new();
		for group in diff.to_add {
			if groups::contains(&resource.status.user_groups, &group) {
				continue;
			}

			let at = Stage::AddToGroup(group.clone());
			guarded(cancel, &at, self.iam.add_user_to_group(&group, &user_name))
				.await?
				.map_err(|source| ReconcileError::Iam {
					stage: at.clone(),
					source,
				})?;

			let mut next = resource.clone();
			next.status.user_groups.push(group.clone());
			*resource = self.persist(&next, at, cancel).await?;
			debug!(group = %group, user_name = %user_name, "user added to group");
			added.push(group);
		}

		Ok((added, diff.to_remove))
	}

	async fn deliver(
		&self,
		key: &AccountKey,
		fields: SecretFields,
		at: &Stage,
		cancel: &CancellationToken,
	) -> Result<(), ReconcileError> {
		guarded(cancel, at, self.sink.store_secret(key, fields))
			.await?
			.map_err(|source| ReconcileError::SecretSink {
				stage: at.clone(),
				source,
			})
	}

	async fn persist(
		&self,
		next: &AccountResource,
		at: Stage,
		cancel: &CancellationToken,
	) -> Result<AccountResource, ReconcileError> {
		guarded(cancel, &at, self.store.update_status(next))
			.await?
			.map_err(|source| ReconcileError::Store { stage: at, source })
	}
}

/// Run `fut` unless `cancel` fires first. An already-cancelled token wins
/// without polling `fut`.
async fn guarded<T>(
	cancel: &CancellationToken,
	stage: &Stage,
	fut: impl Future<Output = T>,
) -> Result<T, ReconcileError> {
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(ReconcileError::Cancelled { stage: stage.clone() }),
		out = fut => Ok(out),
	}
}
