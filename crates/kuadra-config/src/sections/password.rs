// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login password policy section.

use kuadra_password::PasswordPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PasswordConfigLayer {
	pub length: Option<usize>,
	pub digits: Option<usize>,
	pub symbols: Option<usize>,
	pub allow_upper: Option<bool>,
	pub allow_repeat: Option<bool>,
}

impl PasswordConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.length.is_some() {
			self.length = other.length;
		}
		if other.digits.is_some() {
			self.digits = other.digits;
		}
		if other.symbols.is_some() {
			self.symbols = other.symbols;
		}
		if other.allow_upper.is_some() {
			self.allow_upper = other.allow_upper;
		}
		if other.allow_repeat.is_some() {
			self.allow_repeat = other.allow_repeat;
		}
	}

	pub fn finalize(self) -> PasswordConfig {
		let defaults = PasswordPolicy::LOGIN_PROFILE;
		PasswordConfig {
			length: self.length.unwrap_or(defaults.length),
			digits: self.digits.unwrap_or(defaults.digits),
			symbols: self.symbols.unwrap_or(defaults.symbols),
			allow_upper: self.allow_upper.unwrap_or(defaults.allow_upper),
			allow_repeat: self.allow_repeat.unwrap_or(defaults.allow_repeat),
		}
	}
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordConfig {
	pub length: usize,
	pub digits: usize,
	pub symbols: usize,
	pub allow_upper: bool,
	pub allow_repeat: bool,
}

impl PasswordConfig {
	pub fn policy(&self) -> PasswordPolicy {
		PasswordPolicy {
			length: self.length,
			digits: self.digits,
			symbols: self.symbols,
			allow_upper: self.allow_upper,
			allow_repeat: self.allow_repeat,
		}
	}
}

impl Default for PasswordConfig {
	fn default() -> Self {
		PasswordConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_match_login_profile_policy() {
		assert_eq!(PasswordConfig::default().policy(), PasswordPolicy::LOGIN_PROFILE);
	}

	#[test]
	fn test_layer_finalize_with_values() {
		let config = PasswordConfigLayer {
			length: Some(32),
			allow_upper: Some(false),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.length, 32);
		assert_eq!(config.digits, 3);
		assert!(!config.allow_upper);
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = PasswordConfigLayer {
			digits: Some(5),
			symbols: Some(1),
			..Default::default()
		};
		base.merge(PasswordConfigLayer {
			symbols: Some(0),
			..Default::default()
		});
		assert_eq!(base.digits, Some(5));
		assert_eq!(base.symbols, Some(0));
	}
}
