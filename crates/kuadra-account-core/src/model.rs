// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account resource model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identity of an account resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
	pub namespace: String,
	pub name: String,
}

impl AccountKey {
	pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			name: name.into(),
		}
	}
}

impl fmt::Display for AccountKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

/// Provisioning progress. Variants are declared in stage order, so the
/// derived `Ord` is the forward direction.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AccountState {
	#[default]
	#[serde(alias = "")]
	New,
	CreatingUser,
	CreatingLoginProfile,
	CreatingAccessKey,
	Created,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
	#[error("unknown account state: {0:?}")]
	Unknown(String),

	#[error("cannot complete {stage} from state {from}")]
	InvalidTransition {
		from: AccountState,
		stage: BootstrapStage,
	},
}

impl AccountState {
	pub const ALL: [AccountState; 5] = [
		AccountState::New,
		AccountState::CreatingUser,
		AccountState::CreatingLoginProfile,
		AccountState::CreatingAccessKey,
		AccountState::Created,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			AccountState::New => "New",
			AccountState::CreatingUser => "CreatingUser",
			AccountState::CreatingLoginProfile => "CreatingLoginProfile",
			AccountState::CreatingAccessKey => "CreatingAccessKey",
			AccountState::Created => "Created",
		}
	}

	/// The bootstrap stage that still has to run, if any. `New` and
	/// `CreatingUser` both mean the user has not been confirmed yet.
	pub fn pending_stage(&self) -> Option<BootstrapStage> {
		match self {
			AccountState::New | AccountState::CreatingUser => Some(BootstrapStage::CreateUser),
			AccountState::CreatingLoginProfile => Some(BootstrapStage::CreateLoginProfile),
			AccountState::CreatingAccessKey => Some(BootstrapStage::CreateAccessKey),
			AccountState::Created => None,
		}
	}

	/// The following state in declaration order.
	pub fn next(&self) -> Option<AccountState> {
		match self {
			AccountState::New => Some(AccountState::CreatingUser),
			AccountState::CreatingUser => Some(AccountState::CreatingLoginProfile),
			AccountState::CreatingLoginProfile => Some(AccountState::CreatingAccessKey),
			AccountState::CreatingAccessKey => Some(AccountState::Created),
			AccountState::Created => None,
		}
	}

	pub fn is_provisioned(&self) -> bool {
		self.pending_stage().is_none()
	}

	/// State reached by completing `stage`. Only the pending stage may be
	/// completed.
	pub fn complete(self, stage: BootstrapStage) -> Result<AccountState, StateError> {
		if self.pending_stage() != Some(stage) {
			return Err(StateError::InvalidTransition { from: self, stage });
		}
		Ok(stage.completed_state())
	}
}

impl fmt::Display for AccountState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AccountState {
	type Err = StateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(AccountState::New);
		}
		AccountState::ALL
			.into_iter()
			.find(|state| state.as_str() == s)
			.ok_or_else(|| StateError::Unknown(s.to_string()))
	}
}

/// One irreversible provisioning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapStage {
	CreateUser,
	CreateLoginProfile,
	CreateAccessKey,
}

impl BootstrapStage {
	pub fn completed_state(&self) -> AccountState {
		match self {
			BootstrapStage::CreateUser => AccountState::CreatingLoginProfile,
			BootstrapStage::CreateLoginProfile => AccountState::CreatingAccessKey,
			BootstrapStage::CreateAccessKey => AccountState::Created,
		}
	}
}

impl fmt::Display for BootstrapStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			BootstrapStage::CreateUser => "create-user",
			BootstrapStage::CreateLoginProfile => "create-login-profile",
			BootstrapStage::CreateAccessKey => "create-access-key",
		};
		f.write_str(name)
	}
}

/// Desired state, owned by whoever declared the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSpec {
	pub user_name: String,
	#[serde(default)]
	pub groups: Vec<String>,
}

/// Observed progress, owned by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
	#[serde(default)]
	pub account_state: AccountState,
	/// Groups confirmed joined, in join order.
	#[serde(default)]
	pub user_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountResource {
	pub key: AccountKey,
	pub spec: AccountSpec,
	pub status: AccountStatus,
	/// Optimistic concurrency token owned by the store.
	pub resource_version: Option<String>,
}

impl AccountResource {
	pub fn new(key: AccountKey, spec: AccountSpec) -> Self {
		Self {
			key,
			spec,
			status: AccountStatus::default(),
			resource_version: None,
		}
	}

	pub fn with_status(mut self, status: AccountStatus) -> Self {
		self.status = status;
		self
	}
}
