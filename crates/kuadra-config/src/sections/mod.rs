// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for the account controller.

pub mod kubernetes;
pub mod password;
pub mod reconcile;

pub use kubernetes::{KubernetesConfig, KubernetesConfigLayer};
pub use password::{PasswordConfig, PasswordConfigLayer};
pub use reconcile::{ReconcileConfig, ReconcileConfigLayer};
