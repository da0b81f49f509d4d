// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use kuadra_account_core::{BootstrapStage, SinkError, StateError, StoreError};
use kuadra_iam::IamError;
use kuadra_password::PasswordError;
use thiserror::Error;

/// Step of a reconcile pass, attached to every failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
	Load,
	CreateUser,
	CreateLoginProfile,
	CreateAccessKey,
	AddToGroup(String),
}

impl From<BootstrapStage> for Stage {
	fn from(stage: BootstrapStage) -> Self {
		match stage {
			BootstrapStage::CreateUser => Stage::CreateUser,
			BootstrapStage::CreateLoginProfile => Stage::CreateLoginProfile,
			BootstrapStage::CreateAccessKey => Stage::CreateAccessKey,
		}
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Stage::Load => f.write_str("load"),
			Stage::CreateUser => f.write_str("create-user"),
			Stage::CreateLoginProfile => f.write_str("create-login-profile"),
			Stage::CreateAccessKey => f.write_str("create-access-key"),
			Stage::AddToGroup(group) => write!(f, "add-to-group({group})"),
		}
	}
}

#[derive(Debug, Error)]
pub enum ReconcileError {
	#[error("IAM call failed during {stage}: {source}")]
	Iam {
		stage: Stage,
		#[source]
		source: IamError,
	},

	#[error("password generation failed: {source}")]
	Password {
		#[source]
		source: PasswordError,
	},

	#[error("status persist failed during {stage}: {source}")]
	Store {
		stage: Stage,
		#[source]
		source: StoreError,
	},

	#[error("secret sink failed during {stage}: {source}")]
	SecretSink {
		stage: Stage,
		#[source]
		source: SinkError,
	},

	#[error("reconcile cancelled during {stage}")]
	Cancelled { stage: Stage },

	#[error(transparent)]
	Transition(#[from] StateError),
}

impl ReconcileError {
	pub fn stage(&self) -> Option<Stage> {
		match self {
			ReconcileError::Iam { stage, .. }
			| ReconcileError::Store { stage, .. }
			| ReconcileError::SecretSink { stage, .. }
			| ReconcileError::Cancelled { stage } => Some(stage.clone()),
			ReconcileError::Password { .. } => Some(Stage::CreateLoginProfile),
			ReconcileError::Transition(_) => None,
		}
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, ReconcileError::Cancelled { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stage_names() {
		assert_eq!(Stage::from(BootstrapStage::CreateAccessKey).to_string(), "create-access-key");
		assert_eq!(Stage::AddToGroup("devs".to_string()).to_string(), "add-to-group(devs)");
	}

	#[test]
	fn errors_carry_their_stage() {
		let err = ReconcileError::Iam {
			stage: Stage::AddToGroup("ops".to_string()),
			source: IamError::Throttled,
		};
		assert_eq!(err.stage(), Some(Stage::AddToGroup("ops".to_string())));
		assert!(err.to_string().contains("add-to-group(ops)"));
		assert!(!err.is_cancelled());

		let err = ReconcileError::Password {
			source: PasswordError::EmptyLength,
		};
		assert_eq!(err.stage(), Some(Stage::CreateLoginProfile));
	}
}
