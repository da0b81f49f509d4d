// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for AWS account provisioning.
//!
//! - [`model`]: account resource, bootstrap state machine
//! - [`groups`]: desired-vs-current group diff
//! - [`store`]: where resources and their status live
//! - [`sink`]: where minted credentials go

pub mod groups;
pub mod model;
pub mod sink;
pub mod store;

pub use groups::{diff, GroupDiff};
pub use model::{
	AccountKey, AccountResource, AccountSpec, AccountState, AccountStatus, BootstrapStage,
	StateError,
};
pub use sink::{
	MemorySecretSink, SecretSink, SinkError, TracingSecretSink, ACCESS_KEY_ID_FIELD,
	PASSWORD_FIELD, SECRET_ACCESS_KEY_FIELD,
};
pub use store::{AccountStore, MemoryAccountStore, StoreError};
