// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use kuadra_common_secret::SecretString;
use serde::{Deserialize, Serialize};

/// A provider-side user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamUser {
	pub user_name: String,
	pub user_id: String,
	pub arn: String,
}

/// Console login profile attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProfile {
	pub user_name: String,
	pub password_reset_required: bool,
}

/// Programmatic credentials. The secret half only ever travels wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKeyPair {
	pub user_name: String,
	pub access_key_id: String,
	pub secret_access_key: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
	pub group_name: String,
	pub user_name: String,
}

/// The operations of [`crate::IamClient`], used for call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IamOperation {
	CreateUser,
	CreateLoginProfile,
	CreateAccessKeyPair,
	AddUserToGroup,
	RemoveUserFromGroup,
}

impl fmt::Display for IamOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			IamOperation::CreateUser => "CreateUser",
			IamOperation::CreateLoginProfile => "CreateLoginProfile",
			IamOperation::CreateAccessKeyPair => "CreateAccessKey",
			IamOperation::AddUserToGroup => "AddUserToGroup",
			IamOperation::RemoveUserFromGroup => "RemoveUserFromGroup",
		};
		f.write_str(name)
	}
}
