// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("AwsAccount not found: {namespace}/{name}")]
	NotFound { namespace: String, name: String },

	#[error("AwsAccount {namespace}/{name} was modified concurrently")]
	Conflict { namespace: String, name: String },

	#[error("Invalid AwsAccount {name}: {message}")]
	InvalidResource { name: String, message: String },

	#[error("Failed to encode AwsAccount: {0}")]
	Encode(#[from] serde_json::Error),
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}
