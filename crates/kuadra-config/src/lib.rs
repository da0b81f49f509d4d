// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Kuadra account controller.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`KUADRA_<SECTION>_<FIELD>`)
//!
//! # Usage
//!
//! ```ignore
//! use kuadra_config::load_config;
//!
//! let config = load_config()?;
//! println!("reconciling {} accounts at a time", config.reconcile.max_concurrent);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ControllerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved controller configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerConfig {
	pub reconcile: ReconcileConfig,
	pub password: PasswordConfig,
	pub kubernetes: KubernetesConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`KUADRA_*`)
/// 2. Config file (`/etc/kuadra/controller.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ControllerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ControllerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	])
}

/// Merge `sources` in precedence order and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ControllerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ControllerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ControllerConfigLayer) -> Result<ControllerConfig, ConfigError> {
	let reconcile = layer.reconcile.unwrap_or_default().finalize();
	let password = layer.password.unwrap_or_default().finalize();
	let kubernetes = layer.kubernetes.unwrap_or_default().finalize();

	validate_config(&reconcile, &password)?;

	info!(
		max_concurrent = reconcile.max_concurrent,
		backoff_base_secs = reconcile.backoff_base_secs,
		backoff_max_secs = reconcile.backoff_max_secs,
		password_length = password.length,
		namespace = kubernetes.namespace.as_deref().unwrap_or("*"),
		"Controller configuration loaded"
	);

	Ok(ControllerConfig {
		reconcile,
		password,
		kubernetes,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(
	reconcile: &ReconcileConfig,
	password: &PasswordConfig,
) -> Result<(), ConfigError> {
	if reconcile.max_concurrent == 0 {
		return Err(ConfigError::Validation(
			"reconcile.max_concurrent must be greater than zero".to_string(),
		));
	}
	if reconcile.queue_capacity == 0 {
		return Err(ConfigError::Validation(
			"reconcile.queue_capacity must be greater than zero".to_string(),
		));
	}
	if !(reconcile.backoff_factor >= 1.0) {
		return Err(ConfigError::Validation(format!(
			"reconcile.backoff_factor must be at least 1.0, got {}",
			reconcile.backoff_factor
		)));
	}
	if reconcile.backoff_base_secs > reconcile.backoff_max_secs {
		return Err(ConfigError::Validation(format!(
			"reconcile.backoff_base_secs ({}) exceeds reconcile.backoff_max_secs ({})",
			reconcile.backoff_base_secs, reconcile.backoff_max_secs
		)));
	}

	password
		.policy()
		.validate()
		.map_err(|e| ConfigError::Validation(format!("password: {e}")))?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn env(vars: &[(&str, &str)]) -> Box<dyn ConfigSource> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		Box::new(EnvSource::with_lookup(move |name| vars.get(name).cloned()))
	}

	fn toml_file(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[test]
	fn test_defaults_only() {
		let config = load_from_sources(vec![Box::new(DefaultsSource), env(&[])]).unwrap();
		assert_eq!(config, ControllerConfig::default());
		assert_eq!(config.reconcile.max_concurrent, 4);
		assert!(config.kubernetes.namespace.is_none());
	}

	#[test]
	fn test_file_overrides_defaults_and_env_overrides_file() {
		let file = toml_file(
			r#"
[reconcile]
max_concurrent = 10
backoff_max_secs = 120

[kubernetes]
namespace = "from-file"
"#,
		);

		let config = load_from_sources(vec![
			env(&[("KUADRA_RECONCILE_MAX_CONCURRENT", "2")]),
			Box::new(TomlSource::new(file.path())),
			Box::new(DefaultsSource),
		])
		.unwrap();

		assert_eq!(config.reconcile.max_concurrent, 2);
		assert_eq!(config.reconcile.backoff_max_secs, 120);
		assert_eq!(config.reconcile.backoff_base_secs, 1);
		assert_eq!(config.kubernetes.namespace.as_deref(), Some("from-file"));
	}

	#[test]
	fn test_malformed_file_is_reported() {
		let file = toml_file("[reconcile\nmax_concurrent = ");
		let err = load_from_sources(vec![Box::new(TomlSource::new(file.path()))]).unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_zero_concurrency_rejected() {
		let err = load_from_sources(vec![env(&[("KUADRA_RECONCILE_MAX_CONCURRENT", "0")])])
			.unwrap_err();
		assert!(err.to_string().contains("max_concurrent"));
	}

	#[test]
	fn test_shrinking_backoff_rejected() {
		let err = load_from_sources(vec![env(&[("KUADRA_RECONCILE_BACKOFF_FACTOR", "0.5")])])
			.unwrap_err();
		assert!(err.to_string().contains("backoff_factor"));
	}

	#[test]
	fn test_base_above_max_rejected() {
		let err = load_from_sources(vec![env(&[
			("KUADRA_RECONCILE_BACKOFF_BASE_SECS", "600"),
			("KUADRA_RECONCILE_BACKOFF_MAX_SECS", "60"),
		])])
		.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_password_classes_longer_than_length_rejected() {
		let err = load_from_sources(vec![env(&[
			("KUADRA_PASSWORD_LENGTH", "4"),
			("KUADRA_PASSWORD_DIGITS", "3"),
			("KUADRA_PASSWORD_SYMBOLS", "3"),
		])])
		.unwrap_err();
		assert!(err.to_string().contains("password"));
	}

	#[test]
	fn test_overflowing_password_classes_rejected() {
		let max = usize::MAX.to_string();
		let err = load_from_sources(vec![
			Box::new(DefaultsSource),
			env(&[
				("KUADRA_PASSWORD_DIGITS", max.as_str()),
				("KUADRA_PASSWORD_SYMBOLS", "1"),
			]),
		])
		.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(ref msg) if msg.starts_with("password")));
	}
}
