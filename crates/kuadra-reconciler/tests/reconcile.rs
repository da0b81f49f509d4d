// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end reconcile passes against the in-memory store, IAM provider and
//! secret sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kuadra_account_core::{
	AccountKey, AccountResource, AccountSpec, AccountState, AccountStatus, MemoryAccountStore,
	MemorySecretSink, StoreError,
};
use kuadra_common_secret::SecretString;
use kuadra_iam::{
	AccessKeyPair, GroupMembership, IamClient, IamError, IamOperation, IamUser, LoginProfile,
	MemoryIamClient,
};
use kuadra_reconciler::{
	AccountReconciler, CancellationToken, ReconcileError, ReconcileOutcome, ReconcileReport, Stage,
};

struct Harness {
	store: MemoryAccountStore,
	iam: MemoryIamClient,
	sink: MemorySecretSink,
	key: AccountKey,
}

impl Harness {
	fn new(state: AccountState, groups: &[&str], user_groups: &[&str]) -> Self {
		let key = AccountKey::new("team-a", "alice");
		let store = MemoryAccountStore::new();
		store.insert(
			AccountResource::new(
				key.clone(),
				AccountSpec {
					user_name: "alice".to_string(),
					groups: strings(groups),
				},
			)
			.with_status(AccountStatus {
				account_state: state,
				user_groups: strings(user_groups),
			}),
		);
		let iam = MemoryIamClient::new();
		if state > AccountState::CreatingUser {
			iam.insert_user("alice");
		}
		Self {
			store,
			iam,
			sink: MemorySecretSink::new(),
			key,
		}
	}

	fn reconciler_with(&self, iam: Arc<dyn IamClient>) -> AccountReconciler {
		AccountReconciler::new(
			Arc::new(self.store.clone()),
			iam,
			Arc::new(self.sink.clone()),
		)
	}

	async fn reconcile(&self) -> Result<ReconcileOutcome, ReconcileError> {
		self
			.reconciler_with(Arc::new(self.iam.clone()))
			.reconcile(&self.key, &CancellationToken::new())
			.await
	}

	fn status(&self) -> AccountStatus {
		self.store.status(&self.key).unwrap()
	}
}

fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

fn converged(outcome: ReconcileOutcome) -> ReconcileReport {
	match outcome {
		ReconcileOutcome::Converged(report) => report,
		other => panic!("expected convergence, got {other:?}"),
	}
}

#[tokio::test]
async fn created_and_synced_account_is_left_alone() {
	let h = Harness::new(AccountState::Created, &["a", "b"], &["b", "a"]);
	let before = h.status();

	let report = converged(h.reconcile().await.unwrap());

	assert!(report.is_noop());
	assert_eq!(h.iam.total_calls(), 0);
	assert_eq!(h.store.update_count(), 0);
	assert_eq!(h.status(), before);
}

#[tokio::test]
async fn second_pass_after_convergence_is_a_noop() {
	let h = Harness::new(AccountState::New, &["a", "b"], &[]);
	h.reconcile().await.unwrap();
	let calls = h.iam.total_calls();
	let updates = h.store.update_count();

	let report = converged(h.reconcile().await.unwrap());

	assert!(report.is_noop());
	assert_eq!(h.iam.total_calls(), calls);
	assert_eq!(h.store.update_count(), updates);
}

#[tokio::test]
async fn persisted_state_only_moves_forward() {
	let h = Harness::new(AccountState::New, &["a"], &[]);
	h.iam
		.fail_once(IamOperation::CreateAccessKeyPair, None, IamError::Throttled);
	h.iam
		.fail_once(IamOperation::AddUserToGroup, None, IamError::Throttled);

	for _ in 0..4 {
		let _ = h.reconcile().await;
	}

	let history: Vec<AccountState> = h
		.store
		.status_history(&h.key)
		.into_iter()
		.map(|s| s.account_state)
		.collect();
	assert!(history.windows(2).all(|w| w[0] <= w[1]), "{history:?}");
	assert_eq!(h.status().account_state, AccountState::Created);
	assert_eq!(h.status().user_groups, strings(&["a"]));
}

#[tokio::test]
async fn persist_failure_replays_only_the_last_call() {
	let h = Harness::new(AccountState::New, &[], &[]);
	// create-user persists, create-login-profile's persist fails.
	h.store
		.fail_update_after(1, StoreError::backend("etcd timeout"));

	let err = h.reconcile().await.unwrap_err();
	assert!(matches!(
		err,
		ReconcileError::Store {
			stage: Stage::CreateLoginProfile,
			..
		}
	));
	assert_eq!(h.status().account_state, AccountState::CreatingLoginProfile);
	assert_eq!(h.iam.call_count(IamOperation::CreateUser), 1);
	assert_eq!(h.iam.call_count(IamOperation::CreateLoginProfile), 1);

	converged(h.reconcile().await.unwrap());
	assert_eq!(h.iam.call_count(IamOperation::CreateUser), 1);
	assert_eq!(h.iam.call_count(IamOperation::CreateLoginProfile), 2);
	assert_eq!(h.iam.call_count(IamOperation::CreateAccessKeyPair), 1);
	assert_eq!(h.status().account_state, AccountState::Created);
}

#[tokio::test]
async fn create_user_is_replayed_when_its_persist_fails() {
	let h = Harness::new(AccountState::New, &[], &[]);
	h.store.fail_next_update(StoreError::backend("etcd timeout"));

	assert!(h.reconcile().await.is_err());
	assert_eq!(h.status().account_state, AccountState::New);

	h.reconcile().await.unwrap();
	assert_eq!(h.iam.call_count(IamOperation::CreateUser), 2);
	assert!(h.iam.user_exists("alice"));
}

#[tokio::test]
async fn groups_converge_from_empty() {
	let h = Harness::new(AccountState::Created, &["a", "b"], &[]);

	let report = converged(h.reconcile().await.unwrap());

	assert_eq!(report.groups_added, strings(&["a", "b"]));
	assert_eq!(h.status().user_groups, strings(&["a", "b"]));
	assert_eq!(h.iam.call_count(IamOperation::AddUserToGroup), 2);
	assert_eq!(h.iam.call_count(IamOperation::RemoveUserFromGroup), 0);
	assert_eq!(h.store.update_count(), 2);
	assert_eq!(h.iam.groups_of("alice"), strings(&["a", "b"]));
}

#[tokio::test]
async fn failed_group_join_is_contained() {
	let h = Harness::new(AccountState::Created, &["a", "b", "c"], &[]);
	h.iam.fail_once(
		IamOperation::AddUserToGroup,
		Some("b"),
		IamError::NoSuchEntity {
			name: "b".to_string(),
		},
	);

	let err = h.reconcile().await.unwrap_err();
	assert!(matches!(
		err,
		ReconcileError::Iam { stage: Stage::AddToGroup(ref g), .. } if g == "b"
	));
	assert_eq!(h.status().user_groups, strings(&["a"]));
	assert_eq!(h.iam.call_count(IamOperation::AddUserToGroup), 2);

	let report = converged(h.reconcile().await.unwrap());
	assert_eq!(report.groups_added, strings(&["b", "c"]));
	assert_eq!(h.status().user_groups, strings(&["a", "b", "c"]));
	assert_eq!(h.iam.call_count(IamOperation::AddUserToGroup), 4);
}

#[tokio::test]
async fn removals_are_reported_but_never_applied() {
	let h = Harness::new(AccountState::Created, &["a"], &["a", "b", "c"]);
	let before = h.status();

	let report = converged(h.reconcile().await.unwrap());

	assert_eq!(report.pending_removals, strings(&["b", "c"]));
	assert!(report.is_noop());
	assert_eq!(h.status(), before);
	assert_eq!(h.iam.call_count(IamOperation::RemoveUserFromGroup), 0);
	assert_eq!(h.store.update_count(), 0);
}

#[tokio::test]
async fn groups_wait_for_bootstrap() {
	let h = Harness::new(AccountState::New, &["a"], &[]);
	h.iam.fail_once(
		IamOperation::CreateLoginProfile,
		None,
		IamError::NoSuchEntity {
			name: "alice".to_string(),
		},
	);

	assert!(h.reconcile().await.is_err());
	assert_eq!(h.iam.call_count(IamOperation::AddUserToGroup), 0);
	assert!(h.status().user_groups.is_empty());
}

#[tokio::test]
async fn concurrent_spec_edit_surfaces_as_conflict() {
	struct EditingIam {
		inner: MemoryIamClient,
		store: MemoryAccountStore,
		key: AccountKey,
	}

	#[async_trait]
	impl IamClient for EditingIam {
		async fn create_user(&self, user_name: &str) -> Result<IamUser, IamError> {
			let edited = AccountSpec {
				user_name: user_name.to_string(),
				groups: strings(&["late"]),
			};
			self.store.update_spec(&self.key, edited).unwrap();
			self.inner.create_user(user_name).await
		}

		async fn create_login_profile(
			&self,
			password: &SecretString,
			user_name: &str,
			password_reset_required: bool,
		) -> Result<LoginProfile, IamError> {
			self
				.inner
				.create_login_profile(password, user_name, password_reset_required)
				.await
		}

		async fn create_access_key_pair(&self, user_name: &str) -> Result<AccessKeyPair, IamError> {
			self.inner.create_access_key_pair(user_name).await
		}

		async fn add_user_to_group(
			&self,
			group_name: &str,
			user_name: &str,
		) -> Result<GroupMembership, IamError> {
			self.inner.add_user_to_group(group_name, user_name).await
		}

		async fn remove_user_from_group(
			&self,
			group_name: &str,
			user_name: &str,
		) -> Result<GroupMembership, IamError> {
			self.inner.remove_user_from_group(group_name, user_name).await
		}
	}

	let h = Harness::new(AccountState::New, &[], &[]);
	let iam = EditingIam {
		inner: h.iam.clone(),
		store: h.store.clone(),
		key: h.key.clone(),
	};

	let err = h
		.reconciler_with(Arc::new(iam))
		.reconcile(&h.key, &CancellationToken::new())
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		ReconcileError::Store {
			source: StoreError::Conflict { .. },
			..
		}
	));
	assert_eq!(h.status().account_state, AccountState::New);

	// A fresh read picks up the edit and the replayed create-user.
	let report = converged(h.reconcile().await.unwrap());
	assert_eq!(report.groups_added, strings(&["late"]));
}

/// Provider whose group joins never complete.
struct StalledGroups {
	inner: MemoryIamClient,
}

#[async_trait]
impl IamClient for StalledGroups {
	async fn create_user(&self, user_name: &str) -> Result<IamUser, IamError> {
		self.inner.create_user(user_name).await
	}

	async fn create_login_profile(
		&self,
		password: &SecretString,
		user_name: &str,
		password_reset_required: bool,
	) -> Result<LoginProfile, IamError> {
		self
			.inner
			.create_login_profile(password, user_name, password_reset_required)
			.await
	}

	async fn create_access_key_pair(&self, user_name: &str) -> Result<AccessKeyPair, IamError> {
		self.inner.create_access_key_pair(user_name).await
	}

	async fn add_user_to_group(
		&self,
		_group_name: &str,
		_user_name: &str,
	) -> Result<GroupMembership, IamError> {
		std::future::pending().await
	}

	async fn remove_user_from_group(
		&self,
		group_name: &str,
		user_name: &str,
	) -> Result<GroupMembership, IamError> {
		self.inner.remove_user_from_group(group_name, user_name).await
	}
}

#[tokio::test]
async fn cancellation_keeps_the_last_checkpoint() {
	let h = Harness::new(AccountState::New, &["a"], &[]);
	let reconciler = h.reconciler_with(Arc::new(StalledGroups {
		inner: h.iam.clone(),
	}));
	let cancel = CancellationToken::new();

	let canceller = {
		let cancel = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(50)).await;
			cancel.cancel();
		})
	};

	let err = reconciler.reconcile(&h.key, &cancel).await.unwrap_err();
	canceller.await.unwrap();

	assert!(matches!(
		err,
		ReconcileError::Cancelled {
			stage: Stage::AddToGroup(ref g)
		} if g == "a"
	));
	let status = h.status();
	assert_eq!(status.account_state, AccountState::Created);
	assert!(status.user_groups.is_empty());
}
