// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KubernetesConfigLayer {
	pub namespace: Option<String>,
}

impl KubernetesConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
	}

	pub fn finalize(self) -> KubernetesConfig {
		KubernetesConfig {
			namespace: self.namespace,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KubernetesConfig {
	/// Namespace the controller manages. `None` covers every namespace.
	pub namespace: Option<String>,
}
