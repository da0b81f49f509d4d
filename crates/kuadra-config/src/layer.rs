// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{KubernetesConfigLayer, PasswordConfigLayer, ReconcileConfigLayer};

/// Controller configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerConfigLayer {
	#[serde(default)]
	pub reconcile: Option<ReconcileConfigLayer>,
	#[serde(default)]
	pub password: Option<PasswordConfigLayer>,
	#[serde(default)]
	pub kubernetes: Option<KubernetesConfigLayer>,
}

impl ControllerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ControllerConfigLayer) {
		merge_option(
			&mut self.reconcile,
			other.reconcile,
			ReconcileConfigLayer::merge,
		);
		merge_option(&mut self.password, other.password, PasswordConfigLayer::merge);
		merge_option(
			&mut self.kubernetes,
			other.kubernetes,
			KubernetesConfigLayer::merge,
		);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
