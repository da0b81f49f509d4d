// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory IAM provider.
//!
//! Behaves like a real provider for the operations the reconciler uses,
//! including tolerance of repeated calls, and records every call so tests can
//! assert exactly which side effects were issued. Failures can be scripted
//! per operation and optionally per target (user or group name).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use kuadra_common_secret::SecretString;
use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;

use crate::client::IamClient;
use crate::error::IamError;
use crate::types::{AccessKeyPair, GroupMembership, IamOperation, IamUser, LoginProfile};

/// Access keys a single user may hold at once.
pub const MAX_ACCESS_KEYS: usize = 2;

const ACCOUNT_ID: &str = "000000000000";

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamCall {
	pub operation: IamOperation,
	/// User name, or group name for membership operations.
	pub target: String,
}

struct ScriptedFailure {
	operation: IamOperation,
	target: Option<String>,
	error: IamError,
	remaining: Option<usize>,
}

impl ScriptedFailure {
	fn matches(&self, operation: IamOperation, target: &str) -> bool {
		self.operation == operation && self.target.as_deref().map_or(true, |t| t == target)
	}
}

struct MemoryUser {
	user_id: String,
	login_password: Option<SecretString>,
	access_keys: Vec<AccessKeyPair>,
	groups: BTreeSet<String>,
}

impl MemoryUser {
	fn new() -> Self {
		let suffix = Alphanumeric.sample_string(&mut rand::thread_rng(), 17);
		Self {
			user_id: format!("AIDA{}", suffix.to_uppercase()),
			login_password: None,
			access_keys: Vec::new(),
			groups: BTreeSet::new(),
		}
	}
}

#[derive(Default)]
struct State {
	users: BTreeMap<String, MemoryUser>,
	calls: Vec<IamCall>,
	failures: Vec<ScriptedFailure>,
}

#[derive(Clone, Default)]
pub struct MemoryIamClient {
	state: Arc<Mutex<State>>,
}

impl MemoryIamClient {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Fail the next matching call with `error`. `target` narrows the rule to
	/// one user (or group, for membership operations).
	pub fn fail_once(&self, operation: IamOperation, target: Option<&str>, error: IamError) {
		self.fail_times(operation, target, error, 1);
	}

	pub fn fail_times(
		&self,
		operation: IamOperation,
		target: Option<&str>,
		error: IamError,
		times: usize,
	) {
		self.lock().failures.push(ScriptedFailure {
			operation,
			target: target.map(str::to_string),
			error,
			remaining: Some(times),
		});
	}

	/// Fail every matching call until [`MemoryIamClient::clear_failures`].
	pub fn fail_always(&self, operation: IamOperation, target: Option<&str>, error: IamError) {
		self.lock().failures.push(ScriptedFailure {
			operation,
			target: target.map(str::to_string),
			error,
			remaining: None,
		});
	}

	/// Create a user out of band, without recording a call.
	pub fn insert_user(&self, user_name: &str) {
		self
			.lock()
			.users
			.entry(user_name.to_string())
			.or_insert_with(MemoryUser::new);
	}

	pub fn clear_failures(&self) {
		self.lock().failures.clear();
	}

	pub fn calls(&self) -> Vec<IamCall> {
		self.lock().calls.clone()
	}

	pub fn call_count(&self, operation: IamOperation) -> usize {
		self
			.lock()
			.calls
			.iter()
			.filter(|c| c.operation == operation)
			.count()
	}

	pub fn total_calls(&self) -> usize {
		self.lock().calls.len()
	}

	pub fn user_exists(&self, user_name: &str) -> bool {
		self.lock().users.contains_key(user_name)
	}

	pub fn has_login_profile(&self, user_name: &str) -> bool {
		self
			.lock()
			.users
			.get(user_name)
			.is_some_and(|u| u.login_password.is_some())
	}

	pub fn login_password(&self, user_name: &str) -> Option<SecretString> {
		self
			.lock()
			.users
			.get(user_name)
			.and_then(|u| u.login_password.clone())
	}

	pub fn access_keys(&self, user_name: &str) -> Vec<AccessKeyPair> {
		self
			.lock()
			.users
			.get(user_name)
			.map(|u| u.access_keys.clone())
			.unwrap_or_default()
	}

	/// Groups the user belongs to, sorted.
	pub fn groups_of(&self, user_name: &str) -> Vec<String> {
		self
			.lock()
			.users
			.get(user_name)
			.map(|u| u.groups.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Record the call and apply any scripted failure for it.
	fn begin(&self, state: &mut State, operation: IamOperation, target: &str) -> Result<(), IamError> {
		state.calls.push(IamCall {
			operation,
			target: target.to_string(),
		});

		let Some(index) = state
			.failures
			.iter()
			.position(|f| f.matches(operation, target))
		else {
			return Ok(());
		};

		let rule = &mut state.failures[index];
		let error = rule.error.clone();
		if let Some(remaining) = rule.remaining.as_mut() {
			*remaining -= 1;
			if *remaining == 0 {
				state.failures.remove(index);
			}
		}
		tracing::debug!(%operation, iam_target = target, error = %error, "scripted IAM failure");
		Err(error)
	}
}

fn no_such_user(user_name: &str) -> IamError {
	IamError::NoSuchEntity {
		name: user_name.to_string(),
	}
}

fn user_arn(user_name: &str) -> String {
	format!("arn:aws:iam::{ACCOUNT_ID}:user/{user_name}")
}

#[async_trait]
impl IamClient for MemoryIamClient {
	async fn create_user(&self, user_name: &str) -> Result<IamUser, IamError> {
		let mut state = self.lock();
		self.begin(&mut state, IamOperation::CreateUser, user_name)?;

		let user = state
			.users
			.entry(user_name.to_string())
			.or_insert_with(MemoryUser::new);

		Ok(IamUser {
			user_name: user_name.to_string(),
			user_id: user.user_id.clone(),
			arn: user_arn(user_name),
		})
	}

	async fn create_login_profile(
		&self,
		password: &SecretString,
		user_name: &str,
		password_reset_required: bool,
	) -> Result<LoginProfile, IamError> {
		let mut state = self.lock();
		self.begin(&mut state, IamOperation::CreateLoginProfile, user_name)?;

		let user = state
			.users
			.get_mut(user_name)
			.ok_or_else(|| no_such_user(user_name))?;
		if user.login_password.is_some() {
			tracing::debug!(user_name, "login profile exists, replacing password");
		}
		user.login_password = Some(password.clone());

		Ok(LoginProfile {
			user_name: user_name.to_string(),
			password_reset_required,
		})
	}

	async fn create_access_key_pair(&self, user_name: &str) -> Result<AccessKeyPair, IamError> {
		let mut state = self.lock();
		self.begin(&mut state, IamOperation::CreateAccessKeyPair, user_name)?;

		let user = state
			.users
			.get_mut(user_name)
			.ok_or_else(|| no_such_user(user_name))?;
		if user.access_keys.len() >= MAX_ACCESS_KEYS {
			return Err(IamError::LimitExceeded {
				message: format!("user {user_name} already has {MAX_ACCESS_KEYS} access keys"),
			});
		}

		let mut rng = rand::thread_rng();
		let key_id: String = (0..16)
			.map(|_| {
				let set = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
				set[rng.gen_range(0..set.len())] as char
			})
			.collect();
		let pair = AccessKeyPair {
			user_name: user_name.to_string(),
			access_key_id: format!("AKIA{key_id}"),
			secret_access_key: SecretString::new(Alphanumeric.sample_string(&mut rng, 40)),
		};
		user.access_keys.push(pair.clone());
		Ok(pair)
	}

	async fn add_user_to_group(
		&self,
		group_name: &str,
		user_name: &str,
	) -> Result<GroupMembership, IamError> {
		let mut state = self.lock();
		self.begin(&mut state, IamOperation::AddUserToGroup, group_name)?;

		let user = state
			.users
			.get_mut(user_name)
			.ok_or_else(|| no_such_user(user_name))?;
		user.groups.insert(group_name.to_string());

		Ok(GroupMembership {
			group_name: group_name.to_string(),
			user_name: user_name.to_string(),
		})
	}

	async fn remove_user_from_group(
		&self,
		group_name: &str,
		user_name: &str,
	) -> Result<GroupMembership, IamError> {
		let mut state = self.lock();
		self.begin(&mut state, IamOperation::RemoveUserFromGroup, group_name)?;

		let user = state
			.users
			.get_mut(user_name)
			.ok_or_else(|| no_such_user(user_name))?;
		user.groups.remove(group_name);

		Ok(GroupMembership {
			group_name: group_name.to_string(),
			user_name: user_name.to_string(),
		})
	}
}
