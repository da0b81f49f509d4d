// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ControllerConfigLayer;
use crate::sections::{KubernetesConfigLayer, PasswordConfigLayer, ReconcileConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ControllerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ControllerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ControllerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/kuadra/controller.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ControllerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ControllerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ControllerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Convention: KUADRA_<SECTION>_<FIELD>
pub struct EnvSource {
	lookup: EnvLookup,
}

impl EnvSource {
	/// Read from the process environment.
	pub fn new() -> Self {
		Self::with_lookup(|name| std::env::var(name).ok())
	}

	/// Read variables through `lookup` instead of the process environment.
	pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
		Self {
			lookup: Box::new(lookup),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T: FromStr>(&self, name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {kind} value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn load_reconcile(&self) -> Result<ReconcileConfigLayer, ConfigError> {
		Ok(ReconcileConfigLayer {
			max_concurrent: self.parsed("KUADRA_RECONCILE_MAX_CONCURRENT", "usize")?,
			backoff_base_secs: self.parsed("KUADRA_RECONCILE_BACKOFF_BASE_SECS", "u64")?,
			backoff_max_secs: self.parsed("KUADRA_RECONCILE_BACKOFF_MAX_SECS", "u64")?,
			backoff_factor: self.parsed("KUADRA_RECONCILE_BACKOFF_FACTOR", "f64")?,
			queue_capacity: self.parsed("KUADRA_RECONCILE_QUEUE_CAPACITY", "usize")?,
		})
	}

	fn load_password(&self) -> Result<PasswordConfigLayer, ConfigError> {
		Ok(PasswordConfigLayer {
			length: self.parsed("KUADRA_PASSWORD_LENGTH", "usize")?,
			digits: self.parsed("KUADRA_PASSWORD_DIGITS", "usize")?,
			symbols: self.parsed("KUADRA_PASSWORD_SYMBOLS", "usize")?,
			allow_upper: self.bool("KUADRA_PASSWORD_ALLOW_UPPER"),
			allow_repeat: self.bool("KUADRA_PASSWORD_ALLOW_REPEAT"),
		})
	}

	fn load_kubernetes(&self) -> KubernetesConfigLayer {
		KubernetesConfigLayer {
			namespace: self.var("KUADRA_KUBERNETES_NAMESPACE"),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ControllerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ControllerConfigLayer {
			reconcile: Some(self.load_reconcile()?),
			password: Some(self.load_password()?),
			kubernetes: Some(self.load_kubernetes()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn env(vars: &[(&str, &str)]) -> EnvSource {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		EnvSource::with_lookup(move |name| vars.get(name).cloned())
	}

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.reconcile.is_none());
		assert!(layer.password.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/controller.toml").load().unwrap();
		assert!(layer.reconcile.is_none());
	}

	#[test]
	fn test_env_source_reads_values() {
		let layer = env(&[
			("KUADRA_RECONCILE_MAX_CONCURRENT", "8"),
			("KUADRA_RECONCILE_BACKOFF_FACTOR", "1.5"),
			("KUADRA_PASSWORD_ALLOW_UPPER", "false"),
			("KUADRA_PASSWORD_ALLOW_REPEAT", "1"),
			("KUADRA_KUBERNETES_NAMESPACE", "accounts"),
		])
		.load()
		.unwrap();

		let reconcile = layer.reconcile.unwrap();
		assert_eq!(reconcile.max_concurrent, Some(8));
		assert_eq!(reconcile.backoff_factor, Some(1.5));
		assert!(reconcile.backoff_base_secs.is_none());

		let password = layer.password.unwrap();
		assert_eq!(password.allow_upper, Some(false));
		assert_eq!(password.allow_repeat, Some(true));

		assert_eq!(
			layer.kubernetes.unwrap().namespace,
			Some("accounts".to_string())
		);
	}

	#[test]
	fn test_env_source_ignores_empty_values() {
		let layer = env(&[("KUADRA_KUBERNETES_NAMESPACE", "")]).load().unwrap();
		assert!(layer.kubernetes.unwrap().namespace.is_none());
	}

	#[test]
	fn test_env_source_rejects_unparseable_number() {
		let err = env(&[("KUADRA_PASSWORD_LENGTH", "twenty")])
			.load()
			.unwrap_err();
		match err {
			ConfigError::InvalidValue { key, .. } => assert_eq!(key, "KUADRA_PASSWORD_LENGTH"),
			other => panic!("unexpected error: {other}"),
		}
	}
}
