// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pod snapshots and the new-pod diff.
//!
//! The squash agent creates the debugger pod asynchronously and squashctl is
//! not told its name. Instead, debug-session pods are snapshotted before the
//! intent is submitted and again afterwards; the pod that appears only in the
//! second snapshot is the result. Anything other than exactly one such pod is
//! reported, never guessed.

use crate::errors::{Result, SquashError};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Debug-session pods of one namespace at one point in time, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct PodSnapshot {
    namespace: String,
    selector: String,
    pods: BTreeMap<String, Pod>,
}

impl PodSnapshot {
    /// Snapshot `pods` listed from `namespace` with `selector`.
    #[must_use]
    pub fn new(namespace: &str, selector: &str, pods: Vec<Pod>) -> Self {
        Self {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            pods: pods.into_iter().map(|p| (p.name_any(), p)).collect(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pods.contains_key(name)
    }

    /// Pods present here but absent from `before`.
    #[must_use]
    pub fn new_since(&self, before: &PodSnapshot) -> Vec<&Pod> {
        debug_assert_eq!(self.namespace, before.namespace);
        debug_assert_eq!(self.selector, before.selector);

        self.pods
            .iter()
            .filter(|(name, _)| !before.contains(name))
            .map(|(_, pod)| pod)
            .collect()
    }
}

/// The single pod present in `current` but not in `before`.
///
/// # Errors
///
/// Returns [`SquashError::PodSetMismatch`] carrying the number of new pods
/// when it is not exactly one.
pub fn single_new_pod(before: &PodSnapshot, current: &PodSnapshot) -> Result<Pod> {
    match current.new_since(before).as_slice() {
        [pod] => Ok((*pod).clone()),
        others => Err(SquashError::PodSetMismatch {
            count: others.len(),
        }),
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod snapshot_tests;
