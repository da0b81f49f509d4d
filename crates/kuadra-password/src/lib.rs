// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Random password generation for IAM login profiles.
//!
//! A [`PasswordPolicy`] fixes the length and the exact number of digits and
//! symbols; the remaining characters are letters. The characters are shuffled
//! so the required classes do not cluster at fixed positions.

use std::collections::HashSet;

use kuadra_common_secret::SecretString;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LOWER_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPER_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "~!@#$%^&*()_+`-={}|[]\\:\"<>?,./";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
	#[error("password length must be greater than zero")]
	EmptyLength,

	#[error("{digits} digits and {symbols} symbols do not fit in a password of length {length}")]
	ClassesExceedLength {
		length: usize,
		digits: usize,
		symbols: usize,
	},

	#[error("{requested} distinct {class} requested but only {available} exist")]
	NotEnoughDistinct {
		class: &'static str,
		requested: usize,
		available: usize,
	},
}

/// Composition rules for a generated password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
	pub length: usize,
	pub digits: usize,
	pub symbols: usize,
	pub allow_upper: bool,
	pub allow_repeat: bool,
}

impl PasswordPolicy {
	/// Policy used for initial IAM console passwords: 20 characters with
	/// three digits, three symbols, mixed case, repeats allowed.
	pub const LOGIN_PROFILE: PasswordPolicy = PasswordPolicy {
		length: 20,
		digits: 3,
		symbols: 3,
		allow_upper: true,
		allow_repeat: true,
	};

	pub fn letters(&self) -> usize {
		self
			.length
			.saturating_sub(self.digits.saturating_add(self.symbols))
	}

	fn letter_set(&self) -> String {
		if self.allow_upper {
			format!("{LOWER_LETTERS}{UPPER_LETTERS}")
		} else {
			LOWER_LETTERS.to_string()
		}
	}

	pub fn validate(&self) -> Result<(), PasswordError> {
		if self.length == 0 {
			return Err(PasswordError::EmptyLength);
		}
		let classes = self.digits.checked_add(self.symbols);
		if classes.map_or(true, |n| n > self.length) {
			return Err(PasswordError::ClassesExceedLength {
				length: self.length,
				digits: self.digits,
				symbols: self.symbols,
			});
		}
		if !self.allow_repeat {
			let checks = [
				("letters", self.letters(), self.letter_set().chars().count()),
				("digits", self.digits, DIGITS.chars().count()),
				("symbols", self.symbols, SYMBOLS.chars().count()),
			];
			for (class, requested, available) in checks {
				if requested > available {
					return Err(PasswordError::NotEnoughDistinct {
						class,
						requested,
						available,
					});
				}
			}
		}
		Ok(())
	}
}

impl Default for PasswordPolicy {
	fn default() -> Self {
		Self::LOGIN_PROFILE
	}
}

/// Produces credential strings for a policy.
pub trait PasswordGenerator: Send + Sync {
	fn generate(&self, policy: &PasswordPolicy) -> Result<SecretString, PasswordError>;
}

/// Generator backed by the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPasswordGenerator;

impl RandomPasswordGenerator {
	pub fn new() -> Self {
		Self
	}
}

impl PasswordGenerator for RandomPasswordGenerator {
	fn generate(&self, policy: &PasswordPolicy) -> Result<SecretString, PasswordError> {
		policy.validate()?;

		let mut rng = rand::thread_rng();
		let mut chars = Vec::with_capacity(policy.length);
		let mut seen = HashSet::new();

		let classes = [
			(policy.letter_set(), policy.letters()),
			(DIGITS.to_string(), policy.digits),
			(SYMBOLS.to_string(), policy.symbols),
		];
		for (set, count) in classes {
			let set: Vec<char> = set.chars().collect();
			let mut picked = 0;
			while picked < count {
				let c = set[rng.gen_range(0..set.len())];
				if !policy.allow_repeat && !seen.insert(c) {
					continue;
				}
				chars.push(c);
				picked += 1;
			}
		}

		chars.shuffle(&mut rng);
		Ok(SecretString::new(chars.into_iter().collect()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn count_in(password: &str, set: &str) -> usize {
		password.chars().filter(|c| set.contains(*c)).count()
	}

	#[test]
	fn login_profile_policy_composition() {
		let password = RandomPasswordGenerator::new()
			.generate(&PasswordPolicy::LOGIN_PROFILE)
			.unwrap();
		let password = password.expose();

		assert_eq!(password.chars().count(), 20);
		assert_eq!(count_in(password, DIGITS), 3);
		assert_eq!(count_in(password, SYMBOLS), 3);
		assert_eq!(
			count_in(password, LOWER_LETTERS) + count_in(password, UPPER_LETTERS),
			14
		);
	}

	#[test]
	fn lowercase_only_when_upper_disallowed() {
		let policy = PasswordPolicy {
			allow_upper: false,
			..PasswordPolicy::LOGIN_PROFILE
		};
		let password = RandomPasswordGenerator::new().generate(&policy).unwrap();
		assert_eq!(count_in(password.expose(), UPPER_LETTERS), 0);
	}

	#[test]
	fn rejects_classes_longer_than_password() {
		let policy = PasswordPolicy {
			length: 5,
			digits: 3,
			symbols: 3,
			..PasswordPolicy::LOGIN_PROFILE
		};
		assert_eq!(
			RandomPasswordGenerator::new().generate(&policy),
			Err(PasswordError::ClassesExceedLength {
				length: 5,
				digits: 3,
				symbols: 3
			})
		);
	}

	#[test]
	fn rejects_class_counts_that_overflow() {
		let policy = PasswordPolicy {
			length: 20,
			digits: usize::MAX,
			symbols: 1,
			..PasswordPolicy::LOGIN_PROFILE
		};
		assert_eq!(
			policy.validate(),
			Err(PasswordError::ClassesExceedLength {
				length: 20,
				digits: usize::MAX,
				symbols: 1
			})
		);
		assert_eq!(policy.letters(), 0);
	}

	#[test]
	fn rejects_zero_length() {
		let policy = PasswordPolicy {
			length: 0,
			digits: 0,
			symbols: 0,
			..PasswordPolicy::LOGIN_PROFILE
		};
		assert_eq!(policy.validate(), Err(PasswordError::EmptyLength));
	}

	#[test]
	fn rejects_more_distinct_digits_than_exist() {
		let policy = PasswordPolicy {
			length: 20,
			digits: 11,
			symbols: 0,
			allow_upper: true,
			allow_repeat: false,
		};
		assert_eq!(
			policy.validate(),
			Err(PasswordError::NotEnoughDistinct {
				class: "digits",
				requested: 11,
				available: 10
			})
		);
	}

	#[test]
	fn no_repeat_produces_distinct_characters() {
		let policy = PasswordPolicy {
			allow_repeat: false,
			..PasswordPolicy::LOGIN_PROFILE
		};
		let password = RandomPasswordGenerator::new().generate(&policy).unwrap();
		let distinct: HashSet<char> = password.expose().chars().collect();
		assert_eq!(distinct.len(), 20);
	}

	proptest! {
		#[test]
		fn generated_password_matches_policy(
			length in 1usize..64,
			digits in 0usize..8,
			symbols in 0usize..8,
			allow_upper in any::<bool>(),
		) {
			prop_assume!(digits + symbols <= length);
			let policy = PasswordPolicy { length, digits, symbols, allow_upper, allow_repeat: true };

			let password = RandomPasswordGenerator::new().generate(&policy).unwrap();
			let password = password.expose();
			prop_assert_eq!(password.chars().count(), length);
			prop_assert_eq!(count_in(password, DIGITS), digits);
			prop_assert_eq!(count_in(password, SYMBOLS), symbols);
		}
	}
}
