// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Debug-target resolution.
//!
//! Turns the possibly incomplete [`MergedOptions`] into a [`DebugTarget`]: a
//! live pod, one of its containers, and a debugger. Every choice follows the
//! same rule:
//!
//! | Candidates | Outcome |
//! |------------|---------|
//! | 0 | [`SquashError::AmbiguousSelection`] with count 0 |
//! | 1 | selected silently |
//! | 2 or more | one prompt; in machine mode an error instead |
//!
//! Namespaces exclude the squash namespace and everything under `kube-`.
//! When a container is given and `--no-guess-pod` is not, pods are narrowed to
//! those running an image that starts with the given value, so a target can
//! be picked by image name.

use crate::cluster::ClusterApi;
use crate::config::MergedOptions;
use crate::constants::{RESERVED_NAMESPACE_PREFIX, SQUASH_NAMESPACE};
use crate::context::Context;
use crate::detect::DebuggerDetector;
use crate::errors::{Result, SquashError};
use crate::prompt::{Prompter, SelectionKind};
use k8s_openapi::api::core::v1::{Container, Pod};
use kube::ResourceExt;
use tracing::{debug, info};

/// A resolved debug target: the listed pod and container objects, not just names.
#[derive(Clone, Debug)]
pub struct DebugTarget {
    pub namespace: String,
    pub pod: Pod,
    pub container: Container,
    pub debugger: String,
}

impl DebugTarget {
    #[must_use]
    pub fn pod_name(&self) -> String {
        self.pod.name_any()
    }

    /// Image of the target container, or `""` if none is set.
    #[must_use]
    pub fn image(&self) -> &str {
        self.container.image.as_deref().unwrap_or("")
    }
}

/// Resolves namespace, pod, container and debugger, then asks for confirmation.
pub struct TargetResolver<'a> {
    cluster: &'a dyn ClusterApi,
    prompter: &'a dyn Prompter,
    detector: &'a dyn DebuggerDetector,
    debuggers: &'a [String],
}

impl<'a> TargetResolver<'a> {
    #[must_use]
    pub fn new(context: &'a Context) -> Self {
        Self {
            cluster: context.cluster.as_ref(),
            prompter: context.prompter.as_ref(),
            detector: context.detector.as_ref(),
            debuggers: &context.debuggers,
        }
    }

    /// Resolve every unset field and pass the confirmation gate.
    ///
    /// # Errors
    ///
    /// - [`SquashError::AmbiguousSelection`] / [`SquashError::Configuration`] when a
    ///   choice cannot be made
    /// - [`SquashError::SelectionNotFound`] when an explicit or chosen value does not exist
    /// - [`SquashError::ClusterApi`] when listing fails
    /// - [`SquashError::UserAborted`] when the user declines
    pub async fn resolve(&self, options: &MergedOptions) -> Result<DebugTarget> {
        let namespace = self.resolve_namespace(options).await?;
        let pod = self.resolve_pod(options, &namespace).await?;
        let container = self.resolve_container(options, &pod)?;
        let debugger = self.resolve_debugger(options, &pod, &container)?;

        let target = DebugTarget {
            namespace,
            pod,
            container,
            debugger,
        };
        info!(
            namespace = %target.namespace,
            pod = %target.pod_name(),
            container = %target.container.name,
            debugger = %target.debugger,
            "Resolved debug target"
        );

        self.confirm(options, &target)?;
        Ok(target)
    }

    /// The explicit namespace, or one chosen among the debuggable namespaces.
    ///
    /// # Errors
    ///
    /// In machine mode, several candidates is a [`SquashError::Configuration`] error.
    pub async fn resolve_namespace(&self, options: &MergedOptions) -> Result<String> {
        if !options.namespace.is_empty() {
            return Ok(options.namespace.clone());
        }

        let candidates = debuggable_namespaces(self.cluster.list_namespaces().await?);
        debug!(candidates = candidates.len(), "Choosing namespace");

        match choose_one(self.prompter, SelectionKind::Namespace, &candidates) {
            Err(SquashError::AmbiguousSelection { count, .. }) if count > 1 && options.machine => {
                Err(SquashError::Configuration(format!(
                    "{count} namespaces are available and machine mode cannot prompt; set {}",
                    SelectionKind::Namespace.flag()
                )))
            }
            other => other,
        }
    }

    /// The explicit pod, or one chosen among the namespace's pods.
    ///
    /// # Errors
    ///
    /// Returns an error when the pod cannot be read or chosen.
    pub async fn resolve_pod(&self, options: &MergedOptions, namespace: &str) -> Result<Pod> {
        if !options.pod.is_empty() {
            return self.cluster.get_pod(namespace, &options.pod).await;
        }

        let pods = self.cluster.list_pods(namespace, None).await?;
        let image_filter = (!options.choose_pod && !options.container.is_empty())
            .then_some(options.container.as_str());
        let candidates = candidate_pods(&pods, image_filter);
        debug!(
            namespace = %namespace,
            listed = pods.len(),
            candidates = candidates.len(),
            "Choosing pod"
        );

        let choice = choose_one(self.prompter, SelectionKind::Pod, &candidates)?;
        pods.into_iter()
            .find(|pod| pod.name_any() == choice)
            .ok_or(SquashError::SelectionNotFound {
                kind: SelectionKind::Pod,
                name: choice,
            })
    }

    /// The explicitly named container, or one chosen among the pod's containers.
    ///
    /// # Errors
    ///
    /// Returns [`SquashError::SelectionNotFound`] if an explicit name matches no
    /// container (exact, case-sensitive). A lone container whose image starts
    /// with the explicit value is accepted unless `--no-guess-pod` is set.
    pub fn resolve_container(&self, options: &MergedOptions, pod: &Pod) -> Result<Container> {
        let containers = pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.as_slice())
            .unwrap_or_default();

        if options.container.is_empty() {
            let names: Vec<String> = containers.iter().map(|c| c.name.clone()).collect();
            let wanted = choose_one(self.prompter, SelectionKind::Container, &names)?;
            return containers
                .iter()
                .find(|c| c.name == wanted)
                .cloned()
                .ok_or(SquashError::SelectionNotFound {
                    kind: SelectionKind::Container,
                    name: wanted,
                });
        }

        let wanted = &options.container;
        if let Some(container) = containers.iter().find(|c| &c.name == wanted) {
            return Ok(container.clone());
        }

        // The value may have picked the pod by image prefix instead of naming a container.
        match containers {
            [only] if !options.choose_pod && image_matches(only, wanted) => {
                debug!(
                    container = %only.name,
                    image_prefix = %wanted,
                    "Auto-selected the only container matching the image prefix"
                );
                Ok(only.clone())
            }
            _ => Err(SquashError::SelectionNotFound {
                kind: SelectionKind::Container,
                name: wanted.clone(),
            }),
        }
    }

    /// The explicit debugger, a detected one, or one chosen from the supported list.
    ///
    /// Detection is skipped with `--no-guess-debugger`; "unknown" is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when no debugger can be chosen.
    pub fn resolve_debugger(
        &self,
        options: &MergedOptions,
        pod: &Pod,
        container: &Container,
    ) -> Result<String> {
        if !options.debugger.is_empty() {
            return Ok(options.debugger.clone());
        }

        if !options.choose_debugger {
            if let Some(detected) = self.detector.detect(pod, container) {
                debug!(debugger = %detected, "Detected debugger");
                return Ok(detected);
            }
            debug!(container = %container.name, "Could not detect debugger");
        }

        choose_one(self.prompter, SelectionKind::Debugger, self.debuggers)
    }

    /// Ask the user to confirm the target unless in machine mode.
    ///
    /// # Errors
    ///
    /// Returns [`SquashError::UserAborted`] if the user declines.
    pub fn confirm(&self, options: &MergedOptions, target: &DebugTarget) -> Result<()> {
        if options.machine {
            return Ok(());
        }

        let question = format!(
            "Going to attach {} to pod {}. continue?",
            target.debugger,
            target.pod_name()
        );
        if self.prompter.confirm(&question)? {
            Ok(())
        } else {
            Err(SquashError::UserAborted)
        }
    }
}

/// Pick exactly one of `candidates`.
///
/// Zero candidates fails, one is returned without prompting, more are put to
/// `prompter` once. An answer outside the list is rejected.
///
/// # Errors
///
/// - [`SquashError::AmbiguousSelection`] with count 0 for an empty list
/// - whatever the prompter returns
/// - [`SquashError::SelectionNotFound`] if the answer is not a candidate
pub fn choose_one(
    prompter: &dyn Prompter,
    kind: SelectionKind,
    candidates: &[String],
) -> Result<String> {
    match candidates {
        [] => Err(SquashError::AmbiguousSelection { kind, count: 0 }),
        [only] => {
            debug!(kind = %kind, choice = %only, "Auto-selected the only candidate");
            Ok(only.clone())
        }
        _ => {
            let choice = prompter.select(kind, candidates)?;
            if candidates.contains(&choice) {
                Ok(choice)
            } else {
                Err(SquashError::SelectionNotFound { kind, name: choice })
            }
        }
    }
}

/// Namespaces a user may debug: everything except the squash namespace and
/// reserved `kube-` namespaces.
#[must_use]
pub fn debuggable_namespaces(namespaces: Vec<String>) -> Vec<String> {
    namespaces
        .into_iter()
        .filter(|ns| ns != SQUASH_NAMESPACE && !ns.starts_with(RESERVED_NAMESPACE_PREFIX))
        .collect()
}

/// Names of `pods`, narrowed to those with a container image starting with
/// `image_prefix` when one is given.
#[must_use]
pub fn candidate_pods(pods: &[Pod], image_prefix: Option<&str>) -> Vec<String> {
    pods.iter()
        .filter(|pod| match image_prefix {
            None => true,
            Some(prefix) => pod
                .spec
                .as_ref()
                .is_some_and(|spec| spec.containers.iter().any(|c| image_matches(c, prefix))),
        })
        .map(|pod| pod.name_any())
        .collect()
}

fn image_matches(container: &Container, prefix: &str) -> bool {
    container
        .image
        .as_deref()
        .is_some_and(|image| image.starts_with(prefix))
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod target_tests;
