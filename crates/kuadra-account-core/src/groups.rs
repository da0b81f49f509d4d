// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Desired-vs-current set difference for group membership.
//!
//! Membership is tested with set semantics, but outputs keep the relative
//! order of their input so the reconciler joins groups in declaration order.
//! Callers comparing results across inputs should sort first.

/// Result of comparing a desired collection with the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDiff<T> {
	/// In `desired` but not in `current`.
	pub to_add: Vec<T>,
	/// In `current` but not in `desired`.
	pub to_remove: Vec<T>,
}

impl<T> GroupDiff<T> {
	pub fn is_empty(&self) -> bool {
		self.to_add.is_empty() && self.to_remove.is_empty()
	}
}

impl<T> Default for GroupDiff<T> {
	fn default() -> Self {
		Self {
			to_add: Vec::new(),
			to_remove: Vec::new(),
		}
	}
}

pub fn contains<T: PartialEq>(items: &[T], value: &T) -> bool {
	items.iter().any(|item| item == value)
}

/// Compute `desired − current` and `current − desired`.
pub fn diff<T>(desired: &[T], current: &[T]) -> GroupDiff<T>
where
	T: PartialEq + Clone,
{
	let to_add = desired
		.iter()
		.filter(|value| !contains(current, value))
		.cloned()
		.collect();
	let to_remove = current
		.iter()
		.filter(|value| !contains(desired, value))
		.cloned()
		.collect();

	GroupDiff { to_add, to_remove }
}
