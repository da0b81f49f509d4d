// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for IAM operations.
pub type IamResult<T> = Result<T, IamError>;

/// Errors reported by an IAM provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IamError {
	#[error("IAM API error: {message}")]
	Api { message: String },

	#[error("IAM entity not found: {name}")]
	NoSuchEntity { name: String },

	#[error("IAM limit exceeded: {message}")]
	LimitExceeded { message: String },

	#[error("IAM request throttled")]
	Throttled,
}

impl IamError {
	pub fn api(message: impl Into<String>) -> Self {
		IamError::Api {
			message: message.into(),
		}
	}
}
