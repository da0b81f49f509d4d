// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Kubernetes backing for account resources.
//!
//! Accounts are `AwsAccount` objects (`kuadra.kuadrant.io/v1`). The reconciler
//! only ever writes their status subresource.

mod crd;
mod error;
mod store;

pub use crd::{AwsAccount, AwsAccountSpec, AwsAccountStatus};
pub use error::{K8sError, K8sResult};
pub use store::KubeAccountStore;
