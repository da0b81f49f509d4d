// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AWS account reconciliation.
//!
//! This crate provides:
//! - [`AccountReconciler`], one checkpointed pass over a single account:
//!   bootstrap stages first, then group additions
//! - [`Controller`], the work queue that schedules passes with per-account
//!   single-flight, bounded parallelism and exponential backoff

pub mod controller;
pub mod engine;
pub mod error;

pub use controller::{
	calculate_backoff_delay, AccountHealth, BackoffPolicy, Controller, ControllerConfig,
	ControllerError, ControllerHandle, ControllerHealth, HealthState, Reconcile,
};
pub use engine::{AccountReconciler, ReconcileOutcome, ReconcileReport};
pub use error::{ReconcileError, Stage};
pub use tokio_util::sync::CancellationToken;
