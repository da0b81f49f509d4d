// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kuadra_account_core::{AccountKey, AccountResource, AccountStore, StoreError};
use kuadra_config::KubernetesConfig;
use kube::{
	api::{Api, PostParams},
	Client,
};
use tracing::{debug, instrument};

use crate::crd::AwsAccount;
use crate::error::K8sError;

/// Account store backed by `AwsAccount` objects. Status writes go through the
/// status subresource and carry the caller's resourceVersion, so the API
/// server rejects writes based on a stale read.
///
/// With a namespace set, accounts in any other namespace are invisible: reads
/// return `None` and status writes fail with `NotFound`.
pub struct KubeAccountStore {
	client: Client,
	namespace: Option<String>,
}

impl KubeAccountStore {
	pub fn new(client: Client) -> Self {
		Self {
			client,
			namespace: None,
		}
	}

	pub fn with_config(client: Client, config: &KubernetesConfig) -> Self {
		Self::new(client).with_namespace(config.namespace.clone())
	}

	pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
		self.namespace = namespace;
		self
	}

	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	/// Create a store that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn try_default() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self::new(client))
	}

	fn api(&self, namespace: &str) -> Api<AwsAccount> {
		Api::namespaced(self.client.clone(), namespace)
	}

	pub async fn get_account(&self, key: &AccountKey) -> Result<Option<AccountResource>, K8sError> {
		if !in_scope(self.namespace(), key) {
			debug!(account = %key, "account outside managed namespace");
			return Ok(None);
		}
		match self.api(&key.namespace).get_opt(&key.name).await? {
			Some(object) => object.into_resource().map(Some),
			None => Ok(None),
		}
	}

	pub async fn replace_account_status(
		&self,
		resource: &AccountResource,
	) -> Result<AccountResource, K8sError> {
		let key = &resource.key;
		if !in_scope(self.namespace(), key) {
			return Err(K8sError::NotFound {
				namespace: key.namespace.clone(),
				name: key.name.clone(),
			});
		}
		let body = serde_json::to_vec(&AwsAccount::from_resource(resource))?;
		match self
			.api(&key.namespace)
			.replace_status(&key.name, &PostParams::default(), body)
			.await
		{
			Ok(object) => object.into_resource(),
			Err(e) => Err(api_error(key, e)),
		}
	}
}

fn in_scope(namespace: Option<&str>, key: &AccountKey) -> bool {
	namespace.map_or(true, |ns| ns == key.namespace)
}

fn api_error(key: &AccountKey, err: kube::Error) -> K8sError {
	match err {
		kube::Error::Api(ref response) if response.code == 404 => K8sError::NotFound {
			namespace: key.namespace.clone(),
			name: key.name.clone(),
		},
		kube::Error::Api(ref response) if response.code == 409 => K8sError::Conflict {
			namespace: key.namespace.clone(),
			name: key.name.clone(),
		},
		e => e.into(),
	}
}

fn store_error(key: &AccountKey, err: K8sError) -> StoreError {
	match err {
		K8sError::NotFound { .. } => StoreError::NotFound { key: key.clone() },
		K8sError::Conflict { .. } => StoreError::Conflict {
			key: key.clone(),
			expected: None,
		},
		other => StoreError::backend(other.to_string()),
	}
}

#[async_trait]
impl AccountStore for KubeAccountStore {
	#[instrument(skip(self), fields(account = %key))]
	async fn get(&self, key: &AccountKey) -> Result<Option<AccountResource>, StoreError> {
		self
			.get_account(key)
			.await
			.map_err(|e| store_error(key, e))
	}

	#[instrument(skip(self, resource), fields(account = %resource.key, state = %resource.status.account_state))]
	async fn update_status(&self, resource: &AccountResource) -> Result<AccountResource, StoreError> {
		self
			.replace_account_status(resource)
			.await
			.map_err(|e| match store_error(&resource.key, e) {
				StoreError::Conflict { key, .. } => StoreError::Conflict {
					key,
					expected: resource.resource_version.clone(),
				},
				other => other,
			})
	}
}
