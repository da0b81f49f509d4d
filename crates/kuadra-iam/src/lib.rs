// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! IAM provisioning capability interface.
//!
//! This crate provides:
//! - [`IamClient`], the operations the account reconciler needs from an
//!   identity provider
//! - provider-neutral result types ([`IamUser`], [`AccessKeyPair`], ...)
//! - [`MemoryIamClient`], an in-memory provider with "already exists"
//!   tolerant semantics, call recording and scripted failures

mod client;
mod error;
mod memory;
mod types;

pub use client::IamClient;
pub use error::{IamError, IamResult};
pub use memory::{IamCall, MemoryIamClient, MAX_ACCESS_KEYS};
pub use types::{AccessKeyPair, GroupMembership, IamOperation, IamUser, LoginProfile};
