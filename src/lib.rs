// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # squashctl - attach debuggers to containers in Kubernetes
//!
//! squashctl attaches an interactive debugger to a process running inside a
//! container in a cluster, without modifying the target workload.
//!
//! ## Overview
//!
//! One invocation runs three steps in order:
//!
//! 1. **Configuration** - defaults, config file, environment and flags are
//!    merged into one immutable [`config::MergedOptions`]
//! 2. **Target resolution** - namespace, pod, container and debugger are
//!    resolved into a [`target::DebugTarget`], auto-selecting single candidates
//!    and prompting (or failing, in machine mode) otherwise
//! 3. **Attachment** - a local port is reserved and the
//!    [`orchestrator::Orchestrator`] either starts a debugger pod directly or,
//!    in secure mode, submits a [`crd::DebugAttachment`] and identifies the pod
//!    the squash agent creates for it
//!
//! ## Modules
//!
//! - [`config`] - layered configuration
//! - [`target`] - debug-target resolution
//! - [`port`] - local port allocation
//! - [`orchestrator`] - the attachment state machine
//! - [`snapshot`] - debug-pod snapshots and the new-pod diff
//! - [`cluster`] - Kubernetes-backed collaborators
//! - [`crd`] - the `DebugAttachment` custom resource
//!
//! ## Example
//!
//! ```rust
//! use squashctl::config::{resolve, ConfigSources, PartialOptions};
//!
//! let options = resolve(ConfigSources {
//!     file: PartialOptions {
//!         namespace: Some("shop".to_string()),
//!         ..Default::default()
//!     },
//!     env: PartialOptions::default(),
//!     flags: PartialOptions {
//!         namespace: Some("payments".to_string()),
//!         ..Default::default()
//!     },
//! });
//!
//! assert_eq!(options.namespace, "payments");
//! assert_eq!(options.local_port, 0);
//! ```

pub mod backoff;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod detect;
pub mod errors;
pub mod labels;
pub mod orchestrator;
pub mod port;
pub mod prompt;
pub mod report;
pub mod snapshot;
pub mod target;

#[cfg(test)]
mod test_support;
