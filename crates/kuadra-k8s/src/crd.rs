// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! `AwsAccount` custom resource and its mapping to the account model.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kuadra_account_core::{AccountKey, AccountResource, AccountSpec, AccountStatus, StateError};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::K8sError;

/// Desired state of an AWS IAM account.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
	group = "kuadra.kuadrant.io",
	version = "v1",
	kind = "AwsAccount",
	plural = "awsaccounts",
	namespaced,
	status = "AwsAccountStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct AwsAccountSpec {
	pub user_name: String,
	#[serde(default)]
	pub groups: Vec<String>,
}

/// Provisioning progress as written to the status subresource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsAccountStatus {
	#[serde(default)]
	pub account_state: String,
	#[serde(default)]
	pub user_groups: Vec<String>,
}

impl From<&AccountSpec> for AwsAccountSpec {
	fn from(spec: &AccountSpec) -> Self {
		Self {
			user_name: spec.user_name.clone(),
			groups: spec.groups.clone(),
		}
	}
}

impl From<&AccountStatus> for AwsAccountStatus {
	fn from(status: &AccountStatus) -> Self {
		Self {
			account_state: status.account_state.as_str().to_string(),
			user_groups: status.user_groups.clone(),
		}
	}
}

impl AwsAccount {
	/// Build the object sent to the status subresource for `resource`.
	pub fn from_resource(resource: &AccountResource) -> Self {
		Self {
			metadata: ObjectMeta {
				name: Some(resource.key.name.clone()),
				namespace: Some(resource.key.namespace.clone()),
				resource_version: resource.resource_version.clone(),
				..Default::default()
			},
			spec: AwsAccountSpec::from(&resource.spec),
			status: Some(AwsAccountStatus::from(&resource.status)),
		}
	}

	pub fn into_resource(self) -> Result<AccountResource, K8sError> {
		let name = self.metadata.name.ok_or_else(|| K8sError::InvalidResource {
			name: String::new(),
			message: "metadata.name is missing".to_string(),
		})?;
		let namespace = self
			.metadata
			.namespace
			.ok_or_else(|| K8sError::InvalidResource {
				name: name.clone(),
				message: "metadata.namespace is missing".to_string(),
			})?;

		let status = match self.status {
			Some(status) => AccountStatus {
				account_state: status
					.account_state
					.parse()
					.map_err(|e: StateError| K8sError::InvalidResource {
						name: name.clone(),
						message: e.to_string(),
					})?,
				user_groups: status.user_groups,
			},
			None => AccountStatus::default(),
		};

		Ok(AccountResource {
			key: AccountKey::new(namespace, name),
			spec: AccountSpec {
				user_name: self.spec.user_name,
				groups: self.spec.groups,
			},
			status,
			resource_version: self.metadata.resource_version,
		})
	}
}
