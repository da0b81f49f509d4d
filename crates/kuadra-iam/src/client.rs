// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kuadra_common_secret::SecretString;

use crate::error::IamError;
use crate::types::{AccessKeyPair, GroupMembership, IamUser, LoginProfile};

/// Operations the account reconciler needs from an identity provider.
///
/// Implementations must tolerate being asked to redo work that already
/// happened: a crash between a successful call and the status write that
/// records it makes the reconciler issue the same call again. Creating a
/// user that exists, or adding a user to a group it already belongs to,
/// must succeed.
#[async_trait]
pub trait IamClient: Send + Sync {
	/// Create the user, or return the existing one.
	async fn create_user(&self, user_name: &str) -> Result<IamUser, IamError>;

	/// Attach a console login profile with the given initial password.
	async fn create_login_profile(
		&self,
		password: &SecretString,
		user_name: &str,
		password_reset_required: bool,
	) -> Result<LoginProfile, IamError>;

	/// Mint a new access key pair for the user.
	async fn create_access_key_pair(&self, user_name: &str) -> Result<AccessKeyPair, IamError>;

	async fn add_user_to_group(
		&self,
		group_name: &str,
		user_name: &str,
	) -> Result<GroupMembership, IamError>;

	/// Not called by the reconciler; group removal is disabled.
	async fn remove_user_from_group(
		&self,
		group_name: &str,
		user_name: &str,
	) -> Result<GroupMembership, IamError>;
}
