// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for credentials minted during account provisioning.
//!
//! Login passwords and access key secrets pass through the reconciler on their
//! way to a secret sink. They must never end up in logs, status writes or
//! error messages, so they travel as [`SecretString`]:
//!
//! - `Debug`, `Display` and `Serialize` always print `[REDACTED]`
//! - the buffer is zeroized on drop
//! - reading the value requires an explicit `.expose()`
//!
//! ```
//! use kuadra_common_secret::SecretString;
//!
//! let password = SecretString::new("hunter2-but-longer".to_string());
//! assert_eq!(format!("{password}"), "[REDACTED]");
//! assert_eq!(password.expose(), "hunter2-but-longer");
//! ```

use std::fmt;

use zeroize::Zeroize;

/// Placeholder written wherever a secret would otherwise be rendered.
pub const REDACTED: &str = "[REDACTED]";

/// A value that must not leak through formatting or serialization.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the wrapped value. Call sites that need the plaintext should be
	/// easy to find in review, so there is no `Deref`.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Secret::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Secret::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

/// Named credential values handed to a secret sink in one batch, e.g.
/// `accessKeyId` + `secretAccessKey`. Insertion order is preserved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretFields {
	fields: Vec<(String, SecretString)>,
}

impl SecretFields {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a field, replacing any earlier value stored under the same name.
	pub fn with(mut self, name: impl Into<String>, value: SecretString) -> Self {
		self.insert(name, value);
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, value: SecretString) {
		let name = name.into();
		match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
			Some((_, slot)) => *slot = value,
			None => self.fields.push((name, value)),
		}
	}

	pub fn get(&self, name: &str) -> Option<&SecretString> {
		self
			.fields
			.iter()
			.find(|(existing, _)| existing == name)
			.map(|(_, value)| value)
	}

	/// Field names in insertion order. Safe to log.
	pub fn names(&self) -> Vec<&str> {
		self.fields.iter().map(|(name, _)| name.as_str()).collect()
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &SecretString)> {
		self.fields.iter().map(|(name, value)| (name.as_str(), value))
	}
}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}
